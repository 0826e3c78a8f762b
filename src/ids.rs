//! Identifier and fixed-point scalar types.
//!
//! Every record kind gets its own niche-optimized id newtype so an
//! `OrgId` can never be passed where a `DebtId` is expected. Percentages
//! and weights are [`Bps`] (basis points, `10000 = 100%`); money is plain
//! `i64` minor currency units.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::error::ArgumentError;

/// Common behaviour of record identifiers, used by the generic repository.
pub trait RecordId:
    Copy + Eq + Ord + std::hash::Hash + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static
{
    /// Build an id from its raw value. Returns `None` for zero.
    fn from_raw(raw: u64) -> Option<Self>;

    /// The raw `u64` value.
    fn raw(self) -> u64;
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Create an id from a raw `u64`. Returns `None` if `raw` is zero.
            pub fn new(raw: u64) -> Option<Self> {
                NonZeroU64::new(raw).map($name)
            }

            /// Get the underlying `u64` value.
            pub fn get(self) -> u64 {
                self.0.get()
            }
        }

        impl RecordId for $name {
            fn from_raw(raw: u64) -> Option<Self> {
                Self::new(raw)
            }

            fn raw(self) -> u64 {
                self.get()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

record_id!(
    /// Organization id.
    OrgId, "org"
);
record_id!(ShareholdingId, "share");
record_id!(RelationshipTypeId, "reltype");
record_id!(RelationshipId, "rel");
record_id!(
    /// Hypergraph node id (the universal entity wrapper, not an org id).
    NodeId, "node"
);
record_id!(HyperedgeId, "hedge");
record_id!(IncidenceId, "inc");
record_id!(AgentId, "agent");
record_id!(EventId, "event");
record_id!(TransitionId, "transition");
record_id!(StockId, "stock");
record_id!(FlowId, "flow");
record_id!(RunId, "run");
record_id!(DebtId, "debt");
record_id!(PaymentId, "payment");

/// Basis points: fixed-point percentage where `10000 = 100.00%`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Bps(u32);

impl Bps {
    /// 100.00%.
    pub const FULL: Bps = Bps(10_000);
    /// 0.00%.
    pub const ZERO: Bps = Bps(0);
    /// 1.00%.
    pub const ONE_PERCENT: Bps = Bps(100);

    /// Validate a raw basis-point value for the named field.
    pub fn checked(field: &'static str, value: u32) -> Result<Self, ArgumentError> {
        if value > Self::FULL.0 {
            return Err(ArgumentError::BasisPointsOutOfRange { field, value });
        }
        Ok(Bps(value))
    }

    /// Build a value known to be in range, saturating at 100%.
    pub fn saturating(value: u32) -> Self {
        Bps(value.min(Self::FULL.0))
    }

    /// Raw basis points.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Multiply two fractions: `self * other / 10000`, truncating.
    ///
    /// Ownership composes multiplicatively along a chain: 60% of 40% is 24%.
    pub fn compose(self, other: Bps) -> Bps {
        let product = u64::from(self.0) * u64::from(other.0) / u64::from(Self::FULL.0);
        // both factors are <= 10000, so the product is too
        Bps(product as u32)
    }

    /// Add two fractions, capping at 100%.
    pub fn saturating_add(self, other: Bps) -> Bps {
        Bps::saturating(self.0.saturating_add(other.0))
    }
}

impl std::fmt::Display for Bps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// The kinds of entity a relationship end or stock owner can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Organization,
    User,
    Agent,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Organization => "organization",
            EntityKind::User => "user",
            EntityKind::Agent => "agent",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "organization" | "org" => Ok(EntityKind::Organization),
            "user" => Ok(EntityKind::User),
            "agent" => Ok(EntityKind::Agent),
            _ => Err(ArgumentError::UnknownVariant {
                kind: "entity kind",
                value: s.to_string(),
                expected: "organization, user, agent".into(),
            }),
        }
    }
}

/// A typed reference to an entity that may live outside this crate (users).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: u64,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: u64) -> Self {
        Self { kind, id }
    }

    pub fn organization(id: OrgId) -> Self {
        Self::new(EntityKind::Organization, id.get())
    }

    pub fn user(id: u64) -> Self {
        Self::new(EntityKind::User, id)
    }

    pub fn agent(id: AgentId) -> Self {
        Self::new(EntityKind::Agent, id.get())
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
