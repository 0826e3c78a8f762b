//! Typed multiplex relationships, queried from either end.
//!
//! Any number of relationships of different (or equal) types may link the
//! same two entities. A query for one entity sees every relationship in
//! which it is the source or the target, annotated with the direction as
//! seen from that entity.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{ArgumentError, GraphError, OrgResult};
use crate::ids::{Bps, EntityRef, RelationshipId, RelationshipTypeId};
use crate::model::{Attributes, Category, Relationship, RelationshipType};
use crate::store::{KeyedLocks, Repository, degrade};

use super::require_name;

/// Which end of a relationship the queried entity sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The queried entity is the source.
    Outgoing,
    /// The queried entity is the target.
    Incoming,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Direction::Outgoing => "outgoing",
            Direction::Incoming => "incoming",
        })
    }
}

/// A relationship as seen from one of its ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipView {
    pub relationship_id: RelationshipId,
    pub type_name: String,
    pub category: Category,
    pub is_directed: bool,
    pub direction: Direction,
    /// The other end.
    pub connected: EntityRef,
    pub weight: Bps,
    pub attributes: Attributes,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

impl RelationshipView {
    /// Whether the validity window contains `date`.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.valid_from.is_none_or(|from| from <= date)
            && self.valid_to.is_none_or(|to| date <= to)
    }

    fn of(entity: EntityRef, rel: Relationship, ty: &RelationshipType) -> Self {
        let (direction, connected) = if rel.source == entity {
            (Direction::Outgoing, rel.target)
        } else {
            (Direction::Incoming, rel.source)
        };
        Self {
            relationship_id: rel.id,
            type_name: ty.name.clone(),
            category: ty.category,
            is_directed: ty.is_directed,
            direction,
            connected,
            weight: rel.weight,
            attributes: rel.attributes,
            valid_from: rel.valid_from,
            valid_to: rel.valid_to,
        }
    }
}

/// Input for [`RelationshipQuery::relate`].
#[derive(Debug, Clone)]
pub struct NewRelationship {
    pub type_id: RelationshipTypeId,
    pub source: EntityRef,
    pub target: EntityRef,
    /// Defaults to 100%.
    pub weight_bps: Option<u32>,
    pub attributes: Attributes,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

impl NewRelationship {
    pub fn new(type_id: RelationshipTypeId, source: EntityRef, target: EntityRef) -> Self {
        Self {
            type_id,
            source,
            target,
            weight_bps: None,
            attributes: Attributes::empty(),
            valid_from: None,
            valid_to: None,
        }
    }

    pub fn weight(mut self, bps: u32) -> Self {
        self.weight_bps = Some(bps);
        self
    }

    pub fn valid(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.valid_from = from;
        self.valid_to = to;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RelationshipQuery {
    repo: Repository,
    type_names: KeyedLocks<String>,
}

impl RelationshipQuery {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            type_names: KeyedLocks::new(),
        }
    }

    /// Register a relationship type. Names are unique, ignoring case.
    pub fn create_type(
        &self,
        name: &str,
        category: Category,
        is_directed: bool,
        is_weighted: bool,
        description: Option<&str>,
    ) -> OrgResult<RelationshipType> {
        let name = require_name("relationship type name", name)?;
        let key = name.to_ascii_lowercase();
        self.type_names.with(key, || -> OrgResult<RelationshipType> {
            let clash = self
                .repo
                .find(|t: &RelationshipType| t.name.eq_ignore_ascii_case(&name))?;
            if clash.is_some() {
                return Err(GraphError::DuplicateRelationshipType { name }.into());
            }
            Ok(self.repo.insert(|id| RelationshipType {
                id,
                name,
                category,
                is_directed,
                is_weighted,
                description: description.map(str::to_string),
            })?)
        })
    }

    pub fn type_by_name(&self, name: &str) -> Option<RelationshipType> {
        let name = name.trim();
        degrade(
            self.repo
                .find(|t: &RelationshipType| t.name.eq_ignore_ascii_case(name)),
            "type_by_name",
        )
    }

    pub fn types(&self) -> Vec<RelationshipType> {
        degrade(self.repo.scan(), "relationship_types")
    }

    /// Link two entities with a typed relationship.
    pub fn relate(&self, new: NewRelationship) -> OrgResult<Relationship> {
        let weight = match new.weight_bps {
            Some(bps) => Bps::checked("weight", bps)?,
            None => Bps::FULL,
        };
        if let (Some(valid_from), Some(valid_to)) = (new.valid_from, new.valid_to) {
            if valid_to < valid_from {
                return Err(ArgumentError::InvalidValidity {
                    valid_from,
                    valid_to,
                }
                .into());
            }
        }
        if self.repo.get::<RelationshipType>(new.type_id)?.is_none() {
            return Err(GraphError::RelationshipTypeNotFound {
                type_id: new.type_id.get(),
            }
            .into());
        }

        let rel = self.repo.insert(|id| Relationship {
            id,
            type_id: new.type_id,
            source: new.source,
            target: new.target,
            weight,
            attributes: new.attributes,
            valid_from: new.valid_from,
            valid_to: new.valid_to,
        })?;
        tracing::debug!(rel = %rel.id, source = %rel.source, target = %rel.target, "related entities");
        Ok(rel)
    }

    /// Every relationship the entity takes part in, ordered by id.
    ///
    /// No temporal filtering is applied. Relationships whose type record is
    /// missing are left out.
    pub fn relationships_of(&self, entity: EntityRef) -> Vec<RelationshipView> {
        self.views(entity, |rel| rel.source == entity || rel.target == entity)
    }

    /// Like [`relationships_of`](Self::relationships_of), restricted to
    /// relationships whose validity window contains `date`.
    pub fn active_relationships_of(
        &self,
        entity: EntityRef,
        date: NaiveDate,
    ) -> Vec<RelationshipView> {
        self.views(entity, |rel| {
            (rel.source == entity || rel.target == entity) && rel.is_valid_on(date)
        })
    }

    /// All relationships linking `a` and `b` in either direction, seen from `a`.
    pub fn between(&self, a: EntityRef, b: EntityRef) -> Vec<RelationshipView> {
        self.views(a, |rel| {
            (rel.source == a && rel.target == b) || (rel.source == b && rel.target == a)
        })
    }

    fn views(
        &self,
        entity: EntityRef,
        pred: impl Fn(&Relationship) -> bool,
    ) -> Vec<RelationshipView> {
        let types: HashMap<RelationshipTypeId, RelationshipType> =
            degrade(self.repo.scan::<RelationshipType>(), "relationship_types")
                .into_iter()
                .map(|t| (t.id, t))
                .collect();
        let rows = degrade(self.repo.filter(pred), "relationships_of");

        let mut skipped = 0usize;
        let views: Vec<RelationshipView> = rows
            .into_iter()
            .filter_map(|rel| match types.get(&rel.type_id) {
                Some(ty) => Some(RelationshipView::of(entity, rel, ty)),
                None => {
                    skipped += 1;
                    None
                }
            })
            .collect();
        if skipped > 0 {
            tracing::debug!(%entity, skipped, "relationships with unknown type skipped");
        }
        views
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrgError;
    use crate::ids::{EntityKind, OrgId};
    use crate::store::testing::down_repo;

    fn org(raw: u64) -> EntityRef {
        EntityRef::organization(OrgId::new(raw).unwrap())
    }

    fn engine() -> (RelationshipQuery, RelationshipType) {
        let q = RelationshipQuery::new(Repository::memory_only());
        let ty = q
            .create_type("supplies", Category::Transaction, true, true, None)
            .unwrap();
        (q, ty)
    }

    #[test]
    fn direction_is_relative_to_queried_entity() {
        let (q, ty) = engine();
        q.relate(NewRelationship::new(ty.id, org(1), org(2)).weight(7_500))
            .unwrap();

        let from_a = q.relationships_of(org(1));
        assert_eq!(from_a.len(), 1);
        assert_eq!(from_a[0].direction, Direction::Outgoing);
        assert_eq!(from_a[0].connected, org(2));
        assert_eq!(from_a[0].type_name, "supplies");
        assert_eq!(from_a[0].weight.get(), 7_500);

        let from_b = q.relationships_of(org(2));
        assert_eq!(from_b.len(), 1);
        assert_eq!(from_b[0].direction, Direction::Incoming);
        assert_eq!(from_b[0].connected, org(1));
        assert_eq!(from_a[0].relationship_id, from_b[0].relationship_id);
    }

    #[test]
    fn multiplex_edges_coexist() {
        let (q, supplies) = engine();
        let partners = q
            .create_type("partners", Category::Partnership, false, false, Some("joint venture"))
            .unwrap();
        q.relate(NewRelationship::new(supplies.id, org(1), org(2))).unwrap();
        q.relate(NewRelationship::new(partners.id, org(2), org(1))).unwrap();
        q.relate(NewRelationship::new(supplies.id, org(1), org(3))).unwrap();

        let links = q.between(org(1), org(2));
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].direction, Direction::Outgoing);
        assert_eq!(links[1].direction, Direction::Incoming);
        assert_eq!(links[1].category, Category::Partnership);
        assert_eq!(q.relationships_of(org(1)).len(), 3);
    }

    #[test]
    fn self_loop_reported_once_as_outgoing() {
        let (q, ty) = engine();
        q.relate(NewRelationship::new(ty.id, org(4), org(4))).unwrap();
        let views = q.relationships_of(org(4));
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].direction, Direction::Outgoing);
    }

    #[test]
    fn entity_kinds_are_distinct() {
        let (q, ty) = engine();
        let user = EntityRef::new(EntityKind::User, 1);
        q.relate(NewRelationship::new(ty.id, user, org(2))).unwrap();
        assert!(q.relationships_of(org(1)).is_empty());
        assert_eq!(q.relationships_of(user).len(), 1);
    }

    #[test]
    fn expired_relationships_are_still_listed() {
        let (q, ty) = engine();
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let jun = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let dec = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        q.relate(NewRelationship::new(ty.id, org(1), org(2)).valid(Some(jan), Some(jun)))
            .unwrap();

        let all = q.relationships_of(org(1));
        assert_eq!(all.len(), 1);
        assert!(all[0].is_active_on(jan));
        assert!(!all[0].is_active_on(dec));
        assert!(q.active_relationships_of(org(1), dec).is_empty());
        assert_eq!(q.active_relationships_of(org(1), jun).len(), 1);
    }

    #[test]
    fn registration_validation() {
        let (q, ty) = engine();
        assert!(matches!(
            q.create_type("SUPPLIES", Category::Custom, true, false, None),
            Err(OrgError::Graph(GraphError::DuplicateRelationshipType { .. }))
        ));
        assert!(matches!(
            q.relate(NewRelationship::new(ty.id, org(1), org(2)).weight(10_001)),
            Err(OrgError::Argument(ArgumentError::BasisPointsOutOfRange { .. }))
        ));
        let later = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let earlier = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(
            q.relate(NewRelationship::new(ty.id, org(1), org(2)).valid(Some(later), Some(earlier))),
            Err(OrgError::Argument(ArgumentError::InvalidValidity { .. }))
        ));
        let ghost = RelationshipTypeId::new(99).unwrap();
        assert!(matches!(
            q.relate(NewRelationship::new(ghost, org(1), org(2))),
            Err(OrgError::Graph(GraphError::RelationshipTypeNotFound { type_id: 99 }))
        ));
        assert_eq!(q.type_by_name("Supplies").unwrap().id, ty.id);
    }

    #[test]
    fn missing_type_rows_are_skipped() {
        let (q, ty) = engine();
        q.relate(NewRelationship::new(ty.id, org(1), org(2))).unwrap();
        q.repo.delete::<RelationshipType>(ty.id).unwrap();
        assert!(q.relationships_of(org(1)).is_empty());
    }

    #[test]
    fn unknown_entity_and_down_store_are_empty() {
        let (q, _) = engine();
        assert!(q.relationships_of(org(42)).is_empty());

        let down = RelationshipQuery::new(down_repo());
        assert!(down.relationships_of(org(1)).is_empty());
        assert!(down.types().is_empty());
    }

    #[test]
    fn concurrent_type_registration_keeps_names_unique() {
        use std::sync::{Arc, Barrier};

        let q = RelationshipQuery::new(Repository::memory_only());
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = ["lends_to", "LENDS_TO"]
            .into_iter()
            .cycle()
            .take(8)
            .map(|name| {
                let q = q.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    q.create_type(name, Category::Transaction, true, true, None)
                        .is_ok()
                })
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(created, 1);
        assert_eq!(q.types().len(), 1);
    }
}
