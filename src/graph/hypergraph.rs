//! N-ary relations as hyperedges over universal entity nodes.
//!
//! A [`HyperNode`] wraps any entity by `(node_type, entity_id)`. A
//! [`Hyperedge`] is one relation instance (a syndicated loan, a consortium)
//! and its participants are the [`Incidence`] rows pointing at it, each with
//! an optional free-text role.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::error::{GraphError, OrgResult};
use crate::ids::{Bps, HyperedgeId, NodeId};
use crate::model::{Attributes, HyperNode, Hyperedge, Incidence};
use crate::store::{KeyedLocks, Repository, degrade};

use super::require_name;

/// One member of a hyperedge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    pub node: NodeId,
    pub label: String,
    pub role: Option<String>,
    pub weight: Bps,
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.role.as_deref() {
            Some(role) if !role.is_empty() => write!(f, "{} ({role})", self.label),
            _ => f.write_str(&self.label),
        }
    }
}

/// A hyperedge the queried node belongs to, with all of its participants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HyperedgeNeighborhood {
    pub hyperedge_id: HyperedgeId,
    pub edge_type: String,
    pub label: String,
    pub weight: Bps,
    /// Ordered by incidence id. Includes the queried node.
    pub participants: Vec<Participant>,
}

impl HyperedgeNeighborhood {
    /// Participants rendered as `"label (role)"`, or `"label"` without a role.
    pub fn participant_labels(&self) -> Vec<String> {
        self.participants.iter().map(ToString::to_string).collect()
    }
}

/// Input for [`Hypergraph::ensure_node`].
#[derive(Debug, Clone)]
pub struct NewNode {
    pub node_type: String,
    pub entity_id: u64,
    pub label: String,
    pub properties: Attributes,
    pub embedding: Option<Vec<f32>>,
}

impl NewNode {
    pub fn new(node_type: impl Into<String>, entity_id: u64, label: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            entity_id,
            label: label.into(),
            properties: Attributes::empty(),
            embedding: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Hypergraph {
    repo: Repository,
    nodes: KeyedLocks<(String, u64)>,
    memberships: KeyedLocks<(HyperedgeId, NodeId)>,
}

impl Hypergraph {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            nodes: KeyedLocks::new(),
            memberships: KeyedLocks::new(),
        }
    }

    /// Return the node for `(node_type, entity_id)`, creating it if absent.
    ///
    /// An existing node keeps its label and properties.
    pub fn ensure_node(&self, new: NewNode) -> OrgResult<HyperNode> {
        let node_type = require_name("node_type", &new.node_type)?;
        let key = (node_type.clone(), new.entity_id);
        self.nodes.with(key, || -> OrgResult<HyperNode> {
            let existing = self.repo.find(|n: &HyperNode| {
                n.node_type == node_type && n.entity_id == new.entity_id
            })?;
            if let Some(node) = existing {
                return Ok(node);
            }
            Ok(self.repo.insert(|id| HyperNode {
                id,
                node_type,
                entity_id: new.entity_id,
                label: new.label,
                properties: new.properties,
                embedding: new.embedding,
            })?)
        })
    }

    pub fn node(&self, id: NodeId) -> Option<HyperNode> {
        degrade(self.repo.get(id), "hypergraph_node")
    }

    pub fn node_for(&self, node_type: &str, entity_id: u64) -> Option<HyperNode> {
        degrade(
            self.repo
                .find(|n: &HyperNode| n.node_type == node_type && n.entity_id == entity_id),
            "node_for",
        )
    }

    /// Create an empty hyperedge. Members are added with [`attach`](Self::attach).
    pub fn add_hyperedge(
        &self,
        edge_type: &str,
        label: &str,
        weight_bps: u32,
        properties: Attributes,
    ) -> OrgResult<Hyperedge> {
        let edge_type = require_name("edge_type", edge_type)?;
        let weight = Bps::checked("weight", weight_bps)?;
        Ok(self.repo.insert(|id| Hyperedge {
            id,
            edge_type,
            label: label.to_string(),
            weight,
            properties,
        })?)
    }

    /// Add `node` to `hyperedge` with an optional role.
    pub fn attach(
        &self,
        hyperedge: HyperedgeId,
        node: NodeId,
        role: Option<&str>,
        weight_bps: Option<u32>,
    ) -> OrgResult<Incidence> {
        let weight = match weight_bps {
            Some(bps) => Bps::checked("weight", bps)?,
            None => Bps::FULL,
        };
        if self.repo.get::<Hyperedge>(hyperedge)?.is_none() {
            return Err(GraphError::HyperedgeNotFound {
                hyperedge_id: hyperedge.get(),
            }
            .into());
        }
        if self.repo.get::<HyperNode>(node)?.is_none() {
            return Err(GraphError::NodeNotFound {
                node_id: node.get(),
            }
            .into());
        }

        self.memberships.with((hyperedge, node), || -> OrgResult<Incidence> {
            let dup = self
                .repo
                .find(|i: &Incidence| i.hyperedge == hyperedge && i.node == node)?;
            if dup.is_some() {
                return Err(GraphError::DuplicateIncidence {
                    hyperedge_id: hyperedge.get(),
                    node_id: node.get(),
                }
                .into());
            }
            Ok(self.repo.insert(|id| Incidence {
                id,
                hyperedge,
                node,
                role: role.map(str::to_string),
                weight,
            })?)
        })
    }

    /// Participants of one hyperedge, ordered by incidence id.
    pub fn members(&self, hyperedge: HyperedgeId) -> Vec<Participant> {
        let incidences = degrade(
            self.repo.filter(|i: &Incidence| i.hyperedge == hyperedge),
            "members",
        );
        let nodes = self.node_labels();
        participants(&incidences, &nodes)
    }

    /// Every hyperedge `node` belongs to, with its full participant list.
    ///
    /// Hyperedges are ordered by id. An unknown node has no neighborhood.
    pub fn neighborhood(&self, node: NodeId) -> Vec<HyperedgeNeighborhood> {
        let incidences: Vec<Incidence> = degrade(self.repo.scan(), "neighborhood");
        let edge_ids: BTreeSet<HyperedgeId> = incidences
            .iter()
            .filter(|i| i.node == node)
            .map(|i| i.hyperedge)
            .collect();
        if edge_ids.is_empty() {
            return Vec::new();
        }

        let nodes = self.node_labels();
        let mut out = Vec::with_capacity(edge_ids.len());
        for edge_id in edge_ids {
            let Some(edge) = degrade(self.repo.get::<Hyperedge>(edge_id), "neighborhood") else {
                continue;
            };
            let members: Vec<Incidence> = incidences
                .iter()
                .filter(|i| i.hyperedge == edge_id)
                .cloned()
                .collect();
            out.push(HyperedgeNeighborhood {
                hyperedge_id: edge.id,
                edge_type: edge.edge_type,
                label: edge.label,
                weight: edge.weight,
                participants: participants(&members, &nodes),
            });
        }
        tracing::debug!(%node, hyperedges = out.len(), "resolved hypergraph neighborhood");
        out
    }

    fn node_labels(&self) -> HashMap<NodeId, String> {
        degrade(self.repo.scan::<HyperNode>(), "hypergraph_nodes")
            .into_iter()
            .map(|n| (n.id, n.label))
            .collect()
    }
}

/// Join incidences to node labels. Incidences of missing nodes are dropped.
fn participants(incidences: &[Incidence], labels: &HashMap<NodeId, String>) -> Vec<Participant> {
    incidences
        .iter()
        .filter_map(|i| {
            Some(Participant {
                node: i.node,
                label: labels.get(&i.node)?.clone(),
                role: i.role.clone(),
                weight: i.weight,
            })
        })
        .collect()
}
