//! The per-tick command/event fixpoint.
//!
//! One pass applies every queued command (which may queue events) and then
//! dispatches every queued event to the handlers (which may queue
//! commands). Passes repeat until both queues are empty. A tick whose
//! passes keep feeding each other stops at the cap: whatever is still
//! queued is dropped and a [`Diagnostic::ResolverCapReached`] is recorded.

use tracing::{debug, warn};

use skirmish_journal::Diagnostic;
use skirmish_units::command::{Command, CommandQueue};
use skirmish_units::event::{Event, EventQueue};
use skirmish_units::store::UnitStore;

use crate::handlers::HandlerSet;

/// What one [`Resolver::resolve`] call produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Applied commands in application order, with outcomes filled in.
    pub commands: Vec<Command>,
    /// Dispatched events in dispatch order.
    pub events: Vec<Event>,
    /// Passes run.
    pub iterations: u32,
    /// Set when the cap was reached with work still queued.
    pub diagnostic: Option<Diagnostic>,
}

/// Drains the queues into the store with an iteration cap.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    max_iterations: u32,
}

impl Resolver {
    /// A cap of zero is treated as one.
    pub fn new(max_iterations: u32) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Run passes until both queues drain or the cap is hit. Both queues
    /// are empty on return.
    pub fn resolve(
        &self,
        store: &mut UnitStore,
        commands: &mut CommandQueue,
        events: &mut EventQueue,
        handlers: &HandlerSet,
        tick: u64,
    ) -> Resolution {
        let mut out = Resolution::default();

        while !(commands.is_empty() && events.is_empty()) {
            if out.iterations == self.max_iterations {
                let diagnostic = Diagnostic::ResolverCapReached {
                    iterations: out.iterations,
                    dropped_commands: commands.len(),
                    dropped_events: events.len(),
                };
                warn!(
                    tick,
                    iterations = out.iterations,
                    dropped_commands = commands.len(),
                    dropped_events = events.len(),
                    "resolver cap reached; dropping queued work"
                );
                commands.clear();
                events.clear();
                out.diagnostic = Some(diagnostic);
                break;
            }
            out.iterations += 1;

            if !commands.is_empty() {
                out.commands.extend(commands.apply(store, events));
            }
            for event in events.drain() {
                handlers.dispatch(&event, store, tick, commands);
                out.events.push(event);
            }
        }

        debug!(
            tick,
            iterations = out.iterations,
            commands = out.commands.len(),
            events = out.events.len(),
            "tick resolved"
        );
        out
    }
}
