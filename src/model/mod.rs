//! Persisted record kinds.
//!
//! Every record carries its own id and implements [`Record`](crate::store::Record)
//! so the repository can store it in its own table. Opaque JSON blobs
//! (attributes, properties, agent state, event payloads) travel as
//! [`Attributes`] and are never interpreted by the core.

/// Implements `as_str`, `Display`, and `FromStr` for a fieldless enum.
macro_rules! text_enum {
    ($name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::ArgumentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(crate::error::ArgumentError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                        expected: [$($text),+].join(", "),
                    }),
                }
            }
        }
    };
}

pub(crate) use text_enum;

pub mod agent;
pub mod debt;
pub mod dynamics;
pub mod event;
pub mod hypergraph;
pub mod org;
pub mod relationship;

pub use agent::{Agent, AgentType};
pub use debt::{Debt, DebtPayment, DebtStatus};
pub use dynamics::{DECIMAL_SCALE, Flow, FlowType, RunStatus, SimulationRun, Stock};
pub use event::{Event, StateTransition};
pub use hypergraph::{HyperNode, Hyperedge, Incidence};
pub use org::{Organization, Shareholding};
pub use relationship::{Category, Relationship, RelationshipType};

use serde::{Deserialize, Serialize};

/// Seconds since the UNIX epoch, the timestamp unit of every record.
pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// An uninterpreted JSON document, kept as text so key order survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(String);

impl Attributes {
    /// The empty object `{}`.
    pub fn empty() -> Self {
        Self("{}".into())
    }

    /// Capture a JSON value.
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self(value.to_string())
    }

    /// Wrap JSON text as-is. The text is not validated.
    pub fn from_raw(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The raw JSON text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse back into a JSON value.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.0)
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_preserve_key_order() {
        let attrs = Attributes::from_raw(r#"{"zeta":1,"alpha":2}"#);
        assert_eq!(attrs.as_str(), r#"{"zeta":1,"alpha":2}"#);
        let value = attrs.to_json().unwrap();
        assert_eq!(value["alpha"], 2);
    }

    #[test]
    fn attributes_default_to_empty_object() {
        assert_eq!(Attributes::default().as_str(), "{}");
    }

    #[test]
    fn text_enums_parse_and_display() {
        assert_eq!("Overdue".parse::<DebtStatus>().unwrap(), DebtStatus::Overdue);
        assert_eq!(Category::Partnership.to_string(), "partnership");
        let err = "sideways".parse::<FlowType>().unwrap_err();
        assert!(err.to_string().contains("sideways"));
    }
}
