//! Relationship layers over the organization tree.
//!
//! - [`ownership`]: effective ownership through weighted shareholding chains (petgraph)
//! - [`hierarchy`]: the legacy single-parent tree, kept acyclic on write
//! - [`relationships`]: typed multiplex edges, queried from either end
//! - [`hypergraph`]: n-ary hyperedges and two-hop neighborhoods
//!
//! Every component holds its own [`Repository`](crate::store::Repository)
//! handle. Read queries fail open: when the store cannot be read they log a
//! warning and return an empty result. Writes validate their arguments before
//! touching the store and propagate every failure.

pub mod hierarchy;
pub mod hypergraph;
pub mod ownership;
pub mod relationships;

pub use hierarchy::Hierarchy;
pub use hypergraph::{HyperedgeNeighborhood, Hypergraph, NewNode, Participant};
pub use ownership::{Holding, NewShareholding, OwnershipPath, OwnershipReport, OwnershipResolver};
pub use relationships::{Direction, NewRelationship, RelationshipQuery, RelationshipView};

use crate::error::ArgumentError;

/// Reject blank names before any store access.
pub(crate) fn require_name(field: &'static str, value: &str) -> Result<String, ArgumentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ArgumentError::EmptyName { field });
    }
    Ok(trimmed.to_string())
}
