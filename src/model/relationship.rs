//! Typed multiplex relationships between entities.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{Bps, EntityRef, RelationshipId, RelationshipTypeId};
use crate::store::{Record, Table};

use super::Attributes;

/// Broad family a relationship type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Ownership,
    Partnership,
    Transaction,
    Dependency,
    Communication,
    Hierarchy,
    Custom,
}

text_enum!(Category, "relationship category" {
    Ownership => "ownership",
    Partnership => "partnership",
    Transaction => "transaction",
    Dependency => "dependency",
    Communication => "communication",
    Hierarchy => "hierarchy",
    Custom => "custom",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipType {
    pub id: RelationshipTypeId,
    /// Unique, compared case-insensitively.
    pub name: String,
    pub category: Category,
    pub is_directed: bool,
    pub is_weighted: bool,
    pub description: Option<String>,
}

impl Record for RelationshipType {
    type Id = RelationshipTypeId;
    const TABLE: Table = Table::RelationshipTypes;

    fn id(&self) -> RelationshipTypeId {
        self.id
    }
}

/// A typed edge. Several may coexist between the same two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub type_id: RelationshipTypeId,
    pub source: EntityRef,
    pub target: EntityRef,
    pub weight: Bps,
    pub attributes: Attributes,
    pub valid_from: Option<NaiveDate>,
    /// `None` means open-ended.
    pub valid_to: Option<NaiveDate>,
}

impl Relationship {
    /// Whether the validity window contains `date`. Missing ends are unbounded.
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.valid_from.is_none_or(|from| from <= date)
            && self.valid_to.is_none_or(|to| date <= to)
    }
}

impl Record for Relationship {
    type Id = RelationshipId;
    const TABLE: Table = Table::Relationships;

    fn id(&self) -> RelationshipId {
        self.id
    }
}
