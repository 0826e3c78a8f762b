//! Event log records and the declarative state-transition table.

use serde::{Deserialize, Serialize};

use crate::ids::{EntityRef, EventId, TransitionId};
use crate::store::{Record, Table};

use super::Attributes;

/// An immutable record of a state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: String,
    pub subject: EntityRef,
    pub payload: Attributes,
    /// The event that caused this one, forming a causal chain.
    pub caused_by: Option<EventId>,
    pub occurred_at: u64,
}

impl Record for Event {
    type Id = EventId;
    const TABLE: Table = Table::Events;

    fn id(&self) -> EventId {
        self.id
    }
}

/// A rule `(entity_type, from_state) --event_type--> to_state`.
///
/// Configuration only: nothing executes these rules against live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub id: TransitionId,
    pub entity_type: String,
    pub from_state: String,
    pub to_state: String,
    pub event_type: String,
    pub description: Option<String>,
}

impl Record for StateTransition {
    type Id = TransitionId;
    const TABLE: Table = Table::StateTransitions;

    fn id(&self) -> TransitionId {
        self.id
    }
}
