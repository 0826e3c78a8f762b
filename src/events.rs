//! Append-only event log and the declarative state-transition table.

use std::collections::HashSet;

use crate::error::{LedgerError, OrgResult};
use crate::graph::require_name;
use crate::ids::{EntityRef, EventId};
use crate::model::{Attributes, Event, StateTransition, now_secs};
use crate::store::{Repository, degrade};

#[derive(Debug, Clone)]
pub struct EventLog {
    repo: Repository,
}

impl EventLog {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Append an event. `caused_by`, when given, must already be in the log.
    pub fn append(
        &self,
        event_type: &str,
        subject: EntityRef,
        payload: Attributes,
        caused_by: Option<EventId>,
    ) -> OrgResult<Event> {
        let event_type = require_name("event_type", event_type)?;
        if let Some(cause) = caused_by {
            if self.repo.get::<Event>(cause)?.is_none() {
                return Err(LedgerError::EventNotFound {
                    event_id: cause.get(),
                }
                .into());
            }
        }
        let event = self.repo.insert(|id| Event {
            id,
            event_type,
            subject,
            payload,
            caused_by,
            occurred_at: now_secs(),
        })?;
        tracing::debug!(event = %event.id, kind = %event.event_type, %subject, "appended event");
        Ok(event)
    }

    pub fn event(&self, id: EventId) -> Option<Event> {
        degrade(self.repo.get(id), "event")
    }

    /// Events about `subject`, in append order.
    pub fn history(&self, subject: EntityRef) -> Vec<Event> {
        degrade(
            self.repo.filter(|e: &Event| e.subject == subject),
            "history",
        )
    }

    /// `event` followed by its cause, that event's cause, and so on.
    pub fn causal_chain(&self, event: EventId) -> Vec<Event> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(event);
        while let Some(id) = cursor {
            if !seen.insert(id) {
                tracing::warn!(%event, at = %id, "causal chain loops");
                break;
            }
            let Some(next) = self.event(id) else { break };
            cursor = next.caused_by;
            chain.push(next);
        }
        chain
    }

    /// Add a rule `(entity_type, from_state) --event_type--> to_state`.
    pub fn define_transition(
        &self,
        entity_type: &str,
        from_state: &str,
        to_state: &str,
        event_type: &str,
        description: Option<&str>,
    ) -> OrgResult<StateTransition> {
        let entity_type = require_name("entity_type", entity_type)?;
        let from_state = require_name("from_state", from_state)?;
        let to_state = require_name("to_state", to_state)?;
        let event_type = require_name("event_type", event_type)?;
        Ok(self.repo.insert(|id| StateTransition {
            id,
            entity_type,
            from_state,
            to_state,
            event_type,
            description: description.map(str::to_string),
        })?)
    }

    /// Rules leaving `from_state` for `entity_type`.
    pub fn transitions_for(&self, entity_type: &str, from_state: &str) -> Vec<StateTransition> {
        degrade(
            self.repo.filter(|t: &StateTransition| {
                t.entity_type == entity_type && t.from_state == from_state
            }),
            "transitions_for",
        )
    }

    /// The first rule matching `(entity_type, from_state, event_type)`.
    pub fn lookup(
        &self,
        entity_type: &str,
        from_state: &str,
        event_type: &str,
    ) -> Option<StateTransition> {
        degrade(
            self.repo.find(|t: &StateTransition| {
                t.entity_type == entity_type
                    && t.from_state == from_state
                    && t.event_type == event_type
            }),
            "lookup",
        )
    }
}
