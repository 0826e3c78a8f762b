//! Seed files: bootstrapping an engine from JSON.
//!
//! A seed names organizations, agents, and stocks by their names rather than
//! by id, so a file can be written by hand:
//!
//! ```json
//! {
//!   "organizations": [{ "name": "Acme" }, { "name": "Beta", "parent": "Acme" }],
//!   "shareholdings": [{ "parent": "Acme", "child": "Beta", "share_bps": 6000 }],
//!   "stocks": [{ "owner": { "org": "Acme" }, "name": "cash", "value": 100000 }],
//!   "debts": [{ "organization": "Beta", "creditor": "First Bank", "amount": 250000 }]
//! }
//! ```
//!
//! Sections are applied in dependency order. An import is not atomic: a
//! failure leaves the records created before it in place.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use miette::Diagnostic;
use serde::Deserialize;
use serde_json::value::RawValue;
use thiserror::Error;

use crate::agents::NewAgent;
use crate::dynamics::{NewFlow, NewStock};
use crate::engine::Engine;
use crate::error::{OrgError, OrgResult};
use crate::graph::{NewNode, NewRelationship, NewShareholding};
use crate::ids::{AgentId, EntityRef, OrgId, StockId};
use crate::ledger::NewDebt;
use crate::model::{AgentType, Attributes, Category, FlowType};

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, Diagnostic)]
pub enum SeedError {
    #[error("failed to parse seed: {message}")]
    #[diagnostic(
        code(orgweave::seed::parse),
        help("Check the seed JSON against the format in the `import` module docs.")
    )]
    Parse { message: String },

    #[error("failed to read seed file: {path}")]
    #[diagnostic(code(orgweave::seed::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("seed refers to unknown {kind} {name:?}")]
    #[diagnostic(
        code(orgweave::seed::unknown_reference),
        help("Declare the {kind} earlier in the seed, or create it before importing.")
    )]
    UnknownReference { kind: &'static str, name: String },
}

// ── Seed data model ─────────────────────────────────────────────────────

/// An entity named in a seed: `{"org": "Acme"}`, `{"user": 7}`, `{"agent": "Treasury"}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedEntity {
    Org(String),
    User(u64),
    Agent(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedOrganization {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub owner: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedAgent {
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    #[serde(default)]
    pub subject: Option<SeedEntity>,
    #[serde(default)]
    pub state: Option<Box<RawValue>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedShareholding {
    pub parent: String,
    pub child: String,
    pub share_bps: u32,
    #[serde(default)]
    pub voting_bps: Option<u32>,
    #[serde(default)]
    pub share_class: Option<String>,
    #[serde(default)]
    pub acquisition_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRelationshipType {
    pub name: String,
    pub category: Category,
    #[serde(default = "yes")]
    pub directed: bool,
    #[serde(default)]
    pub weighted: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRelationship {
    #[serde(rename = "type")]
    pub type_name: String,
    pub source: SeedEntity,
    pub target: SeedEntity,
    #[serde(default)]
    pub weight_bps: Option<u32>,
    #[serde(default)]
    pub attributes: Option<Box<RawValue>>,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedParticipant {
    pub entity: SeedEntity,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub weight_bps: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedHyperedge {
    pub edge_type: String,
    pub label: String,
    #[serde(default = "full_bps")]
    pub weight_bps: u32,
    #[serde(default)]
    pub participants: Vec<SeedParticipant>,
}

fn full_bps() -> u32 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedStock {
    pub owner: SeedEntity,
    pub name: String,
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// A flow between stocks of one owner, referenced by stock name.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedFlow {
    pub owner: SeedEntity,
    pub name: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(rename = "type")]
    pub flow_type: FlowType,
    pub rate: i64,
    #[serde(default)]
    pub formula: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedDebt {
    pub organization: String,
    pub creditor: String,
    pub amount: i64,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// A complete seed file. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Seed {
    pub organizations: Vec<SeedOrganization>,
    pub agents: Vec<SeedAgent>,
    pub shareholdings: Vec<SeedShareholding>,
    pub relationship_types: Vec<SeedRelationshipType>,
    pub relationships: Vec<SeedRelationship>,
    pub hyperedges: Vec<SeedHyperedge>,
    pub stocks: Vec<SeedStock>,
    pub flows: Vec<SeedFlow>,
    pub debts: Vec<SeedDebt>,
}

impl Seed {
    pub fn from_json_str(text: &str) -> Result<Self, SeedError> {
        serde_json::from_str(text).map_err(|e| SeedError::Parse {
            message: e.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, SeedError> {
        let text = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

/// Counts of records created by an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub organizations: usize,
    pub agents: usize,
    pub shareholdings: usize,
    pub relationship_types: usize,
    pub relationships: usize,
    pub hyperedges: usize,
    pub incidences: usize,
    pub stocks: usize,
    pub flows: usize,
    pub debts: usize,
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "imported")?;
        writeln!(f, "  organizations:      {}", self.organizations)?;
        writeln!(f, "  agents:             {}", self.agents)?;
        writeln!(f, "  shareholdings:      {}", self.shareholdings)?;
        writeln!(f, "  relationship types: {}", self.relationship_types)?;
        writeln!(f, "  relationships:      {}", self.relationships)?;
        writeln!(f, "  hyperedges:         {} ({} members)", self.hyperedges, self.incidences)?;
        writeln!(f, "  stocks:             {}", self.stocks)?;
        writeln!(f, "  flows:              {}", self.flows)?;
        writeln!(f, "  debts:              {}", self.debts)?;
        Ok(())
    }
}

// ── Import ──────────────────────────────────────────────────────────────

struct Importer<'a> {
    engine: &'a Engine,
    orgs: HashMap<String, OrgId>,
    agents: HashMap<String, AgentId>,
}

impl Importer<'_> {
    fn org(&self, name: &str) -> OrgResult<OrgId> {
        if let Some(id) = self.orgs.get(name) {
            return Ok(*id);
        }
        match self.engine.hierarchy().resolve(name) {
            Ok(org) => Ok(org.id),
            Err(OrgError::Graph(_)) => Err(SeedError::UnknownReference {
                kind: "organization",
                name: name.to_string(),
            }
            .into()),
            Err(e) => Err(e),
        }
    }

    fn agent(&self, name: &str) -> OrgResult<AgentId> {
        if let Some(id) = self.agents.get(name) {
            return Ok(*id);
        }
        self.engine
            .agents()
            .agents()
            .into_iter()
            .find(|a| a.name == name)
            .map(|a| a.id)
            .ok_or_else(|| {
                SeedError::UnknownReference {
                    kind: "agent",
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// The entity reference plus a display label for hypergraph nodes.
    fn entity(&self, entity: &SeedEntity) -> OrgResult<(EntityRef, String)> {
        Ok(match entity {
            SeedEntity::Org(name) => (EntityRef::organization(self.org(name)?), name.clone()),
            SeedEntity::User(id) => (EntityRef::user(*id), format!("user {id}")),
            SeedEntity::Agent(name) => (EntityRef::agent(self.agent(name)?), name.clone()),
        })
    }

    fn stock(&self, owner: EntityRef, name: &str) -> OrgResult<StockId> {
        self.engine
            .dynamics()
            .stocks_of(owner)
            .into_iter()
            .find(|s| s.name == name)
            .map(|s| s.id)
            .ok_or_else(|| {
                SeedError::UnknownReference {
                    kind: "stock",
                    name: format!("{owner}/{name}"),
                }
                .into()
            })
    }
}

/// Apply a seed to an engine.
pub fn import(engine: &Engine, seed: &Seed) -> OrgResult<ImportSummary> {
    let mut ctx = Importer {
        engine,
        orgs: HashMap::new(),
        agents: HashMap::new(),
    };
    let mut summary = ImportSummary::default();

    for org in &seed.organizations {
        let parent = org.parent.as_deref().map(|p| ctx.org(p)).transpose()?;
        let created = engine
            .hierarchy()
            .create_organization(&org.name, parent, org.owner)?;
        ctx.orgs.insert(org.name.clone(), created.id);
        summary.organizations += 1;
    }

    for agent in &seed.agents {
        let mut new = NewAgent::new(&agent.name, agent.agent_type);
        if let Some(subject) = &agent.subject {
            new.subject = Some(ctx.entity(subject)?.0);
        }
        if let Some(state) = &agent.state {
            new.state = Attributes::from_raw(state.get());
        }
        let created = engine.agents().create_agent(new)?;
        ctx.agents.insert(agent.name.clone(), created.id);
        summary.agents += 1;
    }

    for holding in &seed.shareholdings {
        engine.ownership().record_shareholding(NewShareholding {
            parent: ctx.org(&holding.parent)?,
            child: ctx.org(&holding.child)?,
            share_bps: holding.share_bps,
            voting_bps: holding.voting_bps,
            share_class: holding.share_class.clone(),
            acquisition_date: holding.acquisition_date,
        })?;
        summary.shareholdings += 1;
    }

    for ty in &seed.relationship_types {
        engine.relationships().create_type(
            &ty.name,
            ty.category,
            ty.directed,
            ty.weighted,
            ty.description.as_deref(),
        )?;
        summary.relationship_types += 1;
    }

    for rel in &seed.relationships {
        let ty = engine
            .relationships()
            .type_by_name(&rel.type_name)
            .ok_or_else(|| SeedError::UnknownReference {
                kind: "relationship type",
                name: rel.type_name.clone(),
            })?;
        let mut new = NewRelationship::new(ty.id, ctx.entity(&rel.source)?.0, ctx.entity(&rel.target)?.0)
            .valid(rel.valid_from, rel.valid_to);
        new.weight_bps = rel.weight_bps;
        if let Some(attrs) = &rel.attributes {
            new.attributes = Attributes::from_raw(attrs.get());
        }
        engine.relationships().relate(new)?;
        summary.relationships += 1;
    }

    for edge in &seed.hyperedges {
        let created = engine.hypergraph().add_hyperedge(
            &edge.edge_type,
            &edge.label,
            edge.weight_bps,
            Attributes::empty(),
        )?;
        for member in &edge.participants {
            let (entity, label) = ctx.entity(&member.entity)?;
            let node = engine
                .hypergraph()
                .ensure_node(NewNode::new(entity.kind.as_str(), entity.id, label))?;
            engine.hypergraph().attach(
                created.id,
                node.id,
                member.role.as_deref(),
                member.weight_bps,
            )?;
            summary.incidences += 1;
        }
        summary.hyperedges += 1;
    }

    for stock in &seed.stocks {
        let (owner, _) = ctx.entity(&stock.owner)?;
        let mut new = NewStock::new(owner, &stock.name, stock.value);
        new.min_value = stock.min;
        new.max_value = stock.max;
        new.unit = stock.unit.clone();
        engine.dynamics().create_stock(new)?;
        summary.stocks += 1;
    }

    for flow in &seed.flows {
        let (owner, _) = ctx.entity(&flow.owner)?;
        let source = flow.source.as_deref().map(|s| ctx.stock(owner, s)).transpose()?;
        let target = flow.target.as_deref().map(|s| ctx.stock(owner, s)).transpose()?;
        engine.dynamics().create_flow(NewFlow {
            name: flow.name.clone(),
            source,
            target,
            flow_type: flow.flow_type,
            rate: flow.rate,
            rate_formula: flow.formula.clone(),
        })?;
        summary.flows += 1;
    }

    for debt in &seed.debts {
        engine.ledger().open_debt(NewDebt {
            organization: ctx.org(&debt.organization)?,
            creditor_name: debt.creditor.clone(),
            amount: debt.amount,
            due_date: debt.due_date,
        })?;
        summary.debts += 1;
    }

    tracing::info!(
        organizations = summary.organizations,
        shareholdings = summary.shareholdings,
        relationships = summary.relationships,
        debts = summary.debts,
        "seed imported"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ids::EntityKind;

    const SEED: &str = r#"{
        "organizations": [
            { "name": "Acme" },
            { "name": "Beta", "parent": "Acme" },
            { "name": "Gamma" }
        ],
        "agents": [{ "name": "Treasury", "type": "collective", "subject": { "org": "Acme" } }],
        "shareholdings": [
            { "parent": "Acme", "child": "Beta", "share_bps": 6000 },
            { "parent": "Beta", "child": "Gamma", "share_bps": 4000 }
        ],
        "relationship_types": [{ "name": "supplies", "category": "transaction" }],
        "relationships": [
            { "type": "supplies", "source": { "org": "Gamma" }, "target": { "user": 7 }, "weight_bps": 2500 }
        ],
        "hyperedges": [{
            "edge_type": "syndicated_loan",
            "label": "Gamma facility",
            "participants": [
                { "entity": { "org": "Acme" }, "role": "lender" },
                { "entity": { "org": "Gamma" }, "role": "borrower" }
            ]
        }],
        "stocks": [{ "owner": { "org": "Acme" }, "name": "cash", "value": 100000, "unit": "EUR" }],
        "flows": [
            { "owner": { "org": "Acme" }, "name": "revenue", "target": "cash", "type": "inflow", "rate": 5000 },
            { "owner": { "org": "Acme" }, "name": "costs", "source": "cash", "type": "outflow", "rate": 3000 }
        ],
        "debts": [{ "organization": "Beta", "creditor": "First Bank", "amount": 250000, "due_date": "2024-06-30" }]
    }"#;

    #[test]
    fn full_seed_imports() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let seed = Seed::from_json_str(SEED).unwrap();
        let summary = import(&engine, &seed).unwrap();
        assert_eq!(summary.organizations, 3);
        assert_eq!(summary.incidences, 2);
        assert_eq!(summary.flows, 2);

        let acme = engine.hierarchy().resolve("Acme").unwrap();
        let gamma = engine
            .ownership()
            .effective_ownership(acme.id)
            .unwrap()
            .into_iter()
            .find(|p| p.descendant_name == "Gamma")
            .unwrap();
        assert_eq!(gamma.effective.get(), 2_400);

        let cash = &engine.dynamics().dynamics(EntityRef::organization(acme.id))[0];
        assert_eq!(cash.projected_value, 102_000);

        let user = EntityRef::new(EntityKind::User, 7);
        assert_eq!(engine.relationships().relationships_of(user).len(), 1);
        assert_eq!(engine.agents().agents().len(), 1);
    }

    #[test]
    fn unknown_names_are_reported() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let seed = Seed::from_json_str(
            r#"{ "shareholdings": [{ "parent": "Nobody", "child": "Else", "share_bps": 10 }] }"#,
        )
        .unwrap();
        assert!(matches!(
            import(&engine, &seed),
            Err(OrgError::Seed(SeedError::UnknownReference { kind: "organization", .. }))
        ));
    }

    #[test]
    fn blobs_keep_their_text() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let seed = Seed::from_json_str(
            r#"{
                "organizations": [{ "name": "Acme" }],
                "agents": [{ "name": "Bot", "type": "individual", "state": {"zeta":1,"alpha":[2, 1]} }],
                "relationship_types": [{ "name": "supplies", "category": "transaction" }],
                "relationships": [{
                    "type": "supplies",
                    "source": { "org": "Acme" },
                    "target": { "user": 7 },
                    "attributes": {"zeta":1,"alpha":2}
                }]
            }"#,
        )
        .unwrap();
        import(&engine, &seed).unwrap();

        let rels: Vec<crate::model::Relationship> = engine.repository().scan().unwrap();
        assert_eq!(rels[0].attributes.as_str(), r#"{"zeta":1,"alpha":2}"#);
        assert_eq!(
            engine.agents().agents()[0].state.as_str(),
            r#"{"zeta":1,"alpha":[2, 1]}"#
        );
    }

    #[test]
    fn numeric_organization_names_resolve_across_imports() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let first =
            Seed::from_json_str(r#"{ "organizations": [{ "name": "Acme" }, { "name": "2024" }] }"#)
                .unwrap();
        import(&engine, &first).unwrap();

        let second = Seed::from_json_str(
            r#"{ "shareholdings": [{ "parent": "Acme", "child": "2024", "share_bps": 5000 }] }"#,
        )
        .unwrap();
        import(&engine, &second).unwrap();

        let acme = engine.hierarchy().resolve("Acme").unwrap();
        let rows = engine.ownership().effective_ownership(acme.id).unwrap();
        assert_eq!(rows[0].descendant_name, "2024");
    }

    #[test]
    fn unknown_sections_rejected() {
        assert!(matches!(
            Seed::from_json_str(r#"{ "planets": [] }"#),
            Err(SeedError::Parse { .. })
        ));
    }
}
