//! Agents: behavioural wrappers over organizations, users, or populations.
//!
//! State and attributes are opaque JSON the core stores but never reads.

use crate::error::OrgResult;
use crate::graph::require_name;
use crate::ids::{AgentId, EntityRef};
use crate::model::{Agent, AgentType, Attributes};
use crate::store::{Repository, degrade};

/// Input for [`AgentRegistry::create_agent`].
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub name: String,
    pub agent_type: AgentType,
    pub subject: Option<EntityRef>,
    pub state: Attributes,
    pub attributes: Attributes,
}

impl NewAgent {
    pub fn new(name: impl Into<String>, agent_type: AgentType) -> Self {
        Self {
            name: name.into(),
            agent_type,
            subject: None,
            state: Attributes::empty(),
            attributes: Attributes::empty(),
        }
    }

    pub fn wrapping(mut self, subject: EntityRef) -> Self {
        self.subject = Some(subject);
        self
    }
}

#[derive(Debug, Clone)]
pub struct AgentRegistry {
    repo: Repository,
}

impl AgentRegistry {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub fn create_agent(&self, new: NewAgent) -> OrgResult<Agent> {
        let name = require_name("agent name", &new.name)?;
        let agent = self.repo.insert(|id| {
            let mut agent = Agent::new(id, name, new.agent_type);
            agent.subject = new.subject;
            agent.state = new.state;
            agent.attributes = new.attributes;
            agent
        })?;
        tracing::debug!(agent = %agent.id, kind = %agent.agent_type, "created agent");
        Ok(agent)
    }

    /// Replace an agent's opaque state.
    pub fn set_state(&self, id: AgentId, state: Attributes) -> OrgResult<Agent> {
        Ok(self.repo.update::<Agent>(id, |a| a.state = state)?)
    }

    pub fn agent(&self, id: AgentId) -> Option<Agent> {
        degrade(self.repo.get(id), "agent")
    }

    /// Every agent, ordered by id.
    pub fn agents(&self) -> Vec<Agent> {
        degrade(self.repo.scan(), "agents")
    }

    /// Agents standing for `subject`.
    pub fn agents_for(&self, subject: EntityRef) -> Vec<Agent> {
        degrade(
            self.repo.filter(|a: &Agent| a.subject == Some(subject)),
            "agents_for",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OrgError, StoreError};
    use crate::ids::OrgId;

    #[test]
    fn create_and_list() {
        let registry = AgentRegistry::new(Repository::memory_only());
        let acme = EntityRef::organization(OrgId::new(1).unwrap());
        let agent = registry
            .create_agent(NewAgent::new("Acme treasury", AgentType::Collective).wrapping(acme))
            .unwrap();
        registry
            .create_agent(NewAgent::new("Households", AgentType::Population))
            .unwrap();

        assert_eq!(registry.agents().len(), 2);
        assert_eq!(registry.agents_for(acme)[0].id, agent.id);
        assert_eq!(registry.agent(agent.id).unwrap().state.as_str(), "{}");
    }

    #[test]
    fn state_is_stored_verbatim() {
        let registry = AgentRegistry::new(Repository::memory_only());
        let agent = registry
            .create_agent(NewAgent::new("Solo", AgentType::Individual))
            .unwrap();
        let updated = registry
            .set_state(agent.id, Attributes::from_raw(r#"{"mood":"cautious"}"#))
            .unwrap();
        assert_eq!(updated.state.as_str(), r#"{"mood":"cautious"}"#);

        assert!(matches!(
            registry.set_state(AgentId::new(9).unwrap(), Attributes::empty()),
            Err(OrgError::Store(StoreError::NotFound { id: 9, .. }))
        ));
    }
}
