use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, EntityRef};
use crate::store::{Record, Table};

use super::{Attributes, now_secs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Individual,
    Collective,
    Population,
}

text_enum!(AgentType, "agent type" {
    Individual => "individual",
    Collective => "collective",
    Population => "population",
});

/// Behavioural wrapper over an organization, user, or population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub agent_type: AgentType,
    /// The entity this agent stands for, if any.
    pub subject: Option<EntityRef>,
    pub state: Attributes,
    pub attributes: Attributes,
    pub created_at: u64,
}

impl Agent {
    pub fn new(id: AgentId, name: impl Into<String>, agent_type: AgentType) -> Self {
        Self {
            id,
            name: name.into(),
            agent_type,
            subject: None,
            state: Attributes::empty(),
            attributes: Attributes::empty(),
            created_at: now_secs(),
        }
    }
}

impl Record for Agent {
    type Id = AgentId;
    const TABLE: Table = Table::Agents;

    fn id(&self) -> AgentId {
        self.id
    }
}
