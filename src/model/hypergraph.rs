//! Hypergraph nodes, hyperedges, and incidences.

use serde::{Deserialize, Serialize};

use crate::ids::{Bps, HyperedgeId, IncidenceId, NodeId};
use crate::store::{Record, Table};

use super::Attributes;

/// Universal wrapper around any entity. `(node_type, entity_id)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperNode {
    pub id: NodeId,
    pub node_type: String,
    pub entity_id: u64,
    pub label: String,
    pub properties: Attributes,
    pub embedding: Option<Vec<f32>>,
}

impl Record for HyperNode {
    type Id = NodeId;
    const TABLE: Table = Table::HyperNodes;

    fn id(&self) -> NodeId {
        self.id
    }
}

/// An n-ary relation instance. Its participants are the incidences that
/// reference it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperedge {
    pub id: HyperedgeId,
    pub edge_type: String,
    pub label: String,
    pub weight: Bps,
    pub properties: Attributes,
}

impl Record for Hyperedge {
    type Id = HyperedgeId;
    const TABLE: Table = Table::Hyperedges;

    fn id(&self) -> HyperedgeId {
        self.id
    }
}

/// Membership of a node in a hyperedge. `(hyperedge, node)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incidence {
    pub id: IncidenceId,
    pub hyperedge: HyperedgeId,
    pub node: NodeId,
    /// Free-text participant role, e.g. "lender".
    pub role: Option<String>,
    pub weight: Bps,
}

impl Record for Incidence {
    type Id = IncidenceId;
    const TABLE: Table = Table::Incidences;

    fn id(&self) -> IncidenceId {
        self.id
    }
}
