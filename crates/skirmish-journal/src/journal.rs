//! Rolling history of [`TickRecord`]s.
//!
//! The journal keeps the most recent `depth` records and discards older
//! ones. Queries walk the retained window oldest first.
//!
//! # Example
//!
//! ```
//! use skirmish_journal::{Journal, TickRecord};
//!
//! let mut journal = Journal::new(2);
//! for tick in 1..=3 {
//!     journal.push(TickRecord::new(tick));
//! }
//! assert_eq!(journal.len(), 2);
//! assert_eq!(journal.latest().map(|r| r.tick), Some(3));
//! assert!(journal.at_tick(1).is_none());
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use skirmish_units::command::Command;
use skirmish_units::event::{Event, EventKind};

use crate::record::{Diagnostic, TickRecord};

/// Bounded tick history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Journal {
    records: VecDeque<TickRecord>,
    depth: usize,
}

impl Journal {
    /// A journal retaining at most `depth` ticks. A depth of zero keeps
    /// nothing.
    pub fn new(depth: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(depth.min(1024)),
            depth,
        }
    }

    /// Append a record, evicting the oldest beyond the depth.
    pub fn push(&mut self, record: TickRecord) {
        self.records.push_back(record);
        while self.records.len() > self.depth {
            self.records.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&TickRecord> {
        self.records.back()
    }

    /// The record for `tick`, if still retained.
    pub fn at_tick(&self, tick: u64) -> Option<&TickRecord> {
        self.records.iter().find(|r| r.tick == tick)
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &TickRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Commands targeting `unit_id` across the retained window.
    pub fn commands_for<'a>(&'a self, unit_id: &'a str) -> impl Iterator<Item = &'a Command> {
        self.records.iter().flat_map(move |r| r.commands_for(unit_id))
    }

    /// Events of `kind` across the retained window.
    pub fn events_of_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.records.iter().flat_map(move |r| r.events_of_kind(kind))
    }

    /// Diagnostics across the retained window, paired with their tick.
    pub fn diagnostics(&self) -> impl Iterator<Item = (u64, &Diagnostic)> {
        self.records
            .iter()
            .flat_map(|r| r.diagnostics.iter().map(move |d| (r.tick, d)))
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_units::prelude::*;

    fn record_with_damage(tick: u64, target: &str) -> TickRecord {
        let mut record = TickRecord::new(tick);
        let mut cmd = Command::new(
            Some(UnitIndex(1)),
            CommandKind::Damage {
                amount: 1.0,
                aspect: "physical".into(),
                source: None,
            },
            "perdurance",
            CausalReason::EventResponse {
                kind: EventKind::Damage,
                event_index: 0,
            },
        );
        cmd.target_id = Some(target.to_owned());
        cmd.applied_successfully = true;
        record.commands.push(cmd);
        record
            .events
            .push(Event::damage(None, target, 1.0, "physical", "test"));
        record
    }

    #[test]
    fn rolling_window_keeps_most_recent() {
        let mut journal = Journal::new(3);
        for tick in 1..=5 {
            journal.push(TickRecord::new(tick));
        }
        let ticks: Vec<u64> = journal.records().map(|r| r.tick).collect();
        assert_eq!(ticks, vec![3, 4, 5]);
        assert!(journal.at_tick(4).is_some());
        assert!(journal.at_tick(2).is_none());
    }

    #[test]
    fn zero_depth_keeps_nothing() {
        let mut journal = Journal::new(0);
        journal.push(TickRecord::new(1));
        assert!(journal.is_empty());
        assert!(journal.latest().is_none());
    }

    #[test]
    fn queries_span_the_window() {
        let mut journal = Journal::new(8);
        journal.push(record_with_damage(1, "ogre"));
        journal.push(record_with_damage(2, "imp"));
        journal.push(record_with_damage(3, "ogre"));
        assert_eq!(journal.commands_for("ogre").count(), 2);
        assert_eq!(journal.commands_for("imp").count(), 1);
        assert_eq!(journal.events_of_kind(EventKind::Damage).count(), 3);
        assert_eq!(journal.events_of_kind(EventKind::Heal).count(), 0);
    }

    #[test]
    fn diagnostics_carry_their_tick() {
        let mut journal = Journal::new(4);
        journal.push(TickRecord::new(1));
        let mut capped = TickRecord::new(2);
        capped.diagnostics.push(Diagnostic::ResolverCapReached {
            iterations: 10,
            dropped_commands: 1,
            dropped_events: 1,
        });
        journal.push(capped);
        let found: Vec<u64> = journal.diagnostics().map(|(tick, _)| tick).collect();
        assert_eq!(found, vec![2]);
    }
}
