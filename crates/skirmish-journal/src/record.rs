//! One tick's worth of produced streams.
//!
//! # Example
//!
//! ```
//! use skirmish_journal::{Diagnostic, TickRecord};
//!
//! let mut record = TickRecord::new(3);
//! record.diagnostics.push(Diagnostic::ResolverCapReached {
//!     iterations: 10,
//!     dropped_commands: 2,
//!     dropped_events: 0,
//! });
//! assert!(record.hit_resolver_cap());
//! assert_eq!(record.digest().len(), 64);
//! ```

use serde::{Deserialize, Serialize};

use skirmish_units::command::Command;
use skirmish_units::event::{Event, EventKind};

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A non-fatal condition recorded during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The fixpoint resolver stopped at its iteration cap. The queued items
    /// it still held were dropped.
    ResolverCapReached {
        iterations: u32,
        dropped_commands: usize,
        dropped_events: usize,
    },
    /// Content referenced something that does not exist (an unknown ability
    /// or effect type). The offending piece was skipped.
    ContentWarning {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// TickRecord
// ---------------------------------------------------------------------------

/// Everything the kernel produced while resolving one tick.
///
/// `commands` and `events` are in application and dispatch order, which is
/// the order consumers must replay them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub tick: u64,
    /// Rule names in execution order.
    pub rules_executed: Vec<String>,
    /// Every command the resolver applied, successful or not.
    pub commands: Vec<Command>,
    /// Every event dispatched to handlers.
    pub events: Vec<Event>,
    /// Resolver passes used this tick.
    pub resolver_iterations: u32,
    pub diagnostics: Vec<Diagnostic>,
}

impl TickRecord {
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    /// Commands whose target was the unit with `unit_id` when applied.
    pub fn commands_for<'a>(&'a self, unit_id: &'a str) -> impl Iterator<Item = &'a Command> {
        self.commands
            .iter()
            .filter(move |c| c.target_id.as_deref() == Some(unit_id))
    }

    pub fn events_of_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    /// Number of commands that applied successfully.
    pub fn succeeded(&self) -> usize {
        self.commands.iter().filter(|c| c.applied_successfully).count()
    }

    pub fn hit_resolver_cap(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::ResolverCapReached { .. }))
    }

    /// BLAKE3 hex digest of the canonical JSON encoding of the command and
    /// event streams.
    ///
    /// Two deterministic runs produce equal digests tick for tick.
    pub fn digest(&self) -> String {
        #[derive(Serialize)]
        struct Streams<'a> {
            tick: u64,
            commands: &'a [Command],
            events: &'a [Event],
        }

        let mut hasher = blake3::Hasher::new();
        let streams = Streams {
            tick: self.tick,
            commands: &self.commands,
            events: &self.events,
        };
        if let Err(e) = serde_json::to_writer(&mut hasher, &streams) {
            tracing::warn!(tick = self.tick, error = %e, "tick streams failed to serialize; digest is partial");
        }
        hasher.finalize().to_hex().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
