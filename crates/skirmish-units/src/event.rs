//! Semantic events and their FIFO queue.
//!
//! An [`Event`] records that something *happened* (a hit landed, a heal was
//! cast, a status was inflicted) without yet deciding what it does to the
//! store. Event handlers in the kernel interpret events into
//! [`Command`](crate::command::Command)s, e.g. reducing a hit according to
//! the target's perdurance before the hp-mutating command is queued.

use serde::{Deserialize, Serialize};

use crate::meta::StatusEffect;

// ---------------------------------------------------------------------------
// EventKind / EventPayload
// ---------------------------------------------------------------------------

/// The closed set of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Damage,
    Heal,
    Status,
}

/// Event details.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventPayload {
    /// Damage aspect (`"physical"`, `"fire"`, ...). `None` for heals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect: Option<String>,
    /// Raw amount before any resistance policy.
    #[serde(default)]
    pub amount: f64,
    /// What produced the event: an ability id, `"burning"`, `"projectile"`.
    pub origin: String,
    /// The status being inflicted, for [`EventKind::Status`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusEffect>,
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A typed semantic occurrence between two units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Id of the unit responsible, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Id of the affected unit.
    pub target: String,
    pub payload: EventPayload,
    /// Sequential index within the tick (set on insertion).
    #[serde(default)]
    pub index: u32,
}

impl Event {
    /// A damage event.
    pub fn damage(
        source: Option<&str>,
        target: &str,
        amount: f64,
        aspect: &str,
        origin: &str,
    ) -> Self {
        Self {
            kind: EventKind::Damage,
            source: source.map(str::to_owned),
            target: target.to_owned(),
            payload: EventPayload {
                aspect: Some(aspect.to_owned()),
                amount,
                origin: origin.to_owned(),
                status: None,
            },
            index: 0,
        }
    }

    /// A heal event.
    pub fn heal(source: Option<&str>, target: &str, amount: f64, origin: &str) -> Self {
        Self {
            kind: EventKind::Heal,
            source: source.map(str::to_owned),
            target: target.to_owned(),
            payload: EventPayload {
                aspect: None,
                amount,
                origin: origin.to_owned(),
                status: None,
            },
            index: 0,
        }
    }

    /// A status event.
    pub fn status(source: Option<&str>, target: &str, status: StatusEffect, origin: &str) -> Self {
        Self {
            kind: EventKind::Status,
            source: source.map(str::to_owned),
            target: target.to_owned(),
            payload: EventPayload {
                aspect: None,
                amount: status.magnitude,
                origin: origin.to_owned(),
                status: Some(status),
            },
            index: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// EventQueue
// ---------------------------------------------------------------------------

/// FIFO queue of pending events.
///
/// Indices increase monotonically until [`reset`](Self::reset), so every
/// event queued within one tick has a unique, ordered index.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<Event>,
    next_index: u32,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event, stamping its index.
    pub fn push(&mut self, mut event: Event) {
        event.index = self.next_index;
        self.next_index += 1;
        self.events.push(event);
    }

    /// Take every queued event in insertion order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Queued events in insertion order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop queued events and restart index numbering.
    pub fn reset(&mut self) {
        self.events.clear();
        self.next_index = 0;
    }

    /// Drop queued events, keeping index numbering.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_keep_increasing_across_drains() {
        let mut q = EventQueue::new();
        q.push(Event::heal(None, "a", 1.0, "test"));
        q.push(Event::heal(None, "b", 1.0, "test"));
        let first = q.drain();
        assert_eq!(first.iter().map(|e| e.index).collect::<Vec<_>>(), vec![0, 1]);
        q.push(Event::damage(Some("b"), "a", 2.0, "fire", "test"));
        assert_eq!(q.events()[0].index, 2);
        q.reset();
        q.push(Event::heal(None, "a", 1.0, "test"));
        assert_eq!(q.events()[0].index, 0);
    }
}
