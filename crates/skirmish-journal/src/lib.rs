//! Skirmish Journal - the produced command and event streams, tick by tick.
//!
//! Every call to the kernel's `step()` yields one [`TickRecord`]: the
//! commands the resolver applied (with their outcomes), the events it
//! dispatched, the rules that ran and any diagnostics. A [`Journal`] keeps a
//! rolling window of recent records for renderers, loggers and tests.
//!
//! # Modules
//!
//! - [`record`]: [`TickRecord`], [`Diagnostic`] and stream digests.
//! - [`journal`]: the bounded [`Journal`] history and its queries.

#![deny(unsafe_code)]

pub mod journal;
pub mod record;

pub use journal::Journal;
pub use record::{Diagnostic, TickRecord};
