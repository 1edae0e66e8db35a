//! Skirmish units -- columnar unit storage with deferred, causally tagged
//! mutation.
//!
//! Units live in a Structure-of-Arrays [`UnitStore`](store::UnitStore)
//! addressed by stable [`UnitIndex`](slot::UnitIndex) values. Nothing outside
//! this crate can write a column directly: rules queue
//! [`Command`](command::Command)s and semantic [`Event`](event::Event)s, and
//! the kernel's resolver applies them in FIFO order.
//!
//! # Quick Start
//!
//! ```
//! use skirmish_units::prelude::*;
//!
//! let mut store = UnitStore::new(16, CapacityPolicy::Grow);
//! let archer = store
//!     .add_unit(UnitSpec::new("archer", Vec2::new(0.0, 0.0), Team::Friendly, 12.0))
//!     .unwrap();
//! let goblin = store
//!     .add_unit(UnitSpec::new("goblin", Vec2::new(3.0, 4.0), Team::Hostile, 6.0))
//!     .unwrap();
//!
//! assert!(hostile(store.team(archer), store.team(goblin)));
//! assert_eq!(store.pos(archer).distance(store.pos(goblin)), 5.0);
//! ```

#![deny(unsafe_code)]

pub mod command;
pub mod event;
pub mod geometry;
pub mod meta;
pub mod slot;
pub mod snapshot;
pub mod store;
pub mod team;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Every slot is taken and the store does not grow.
    #[error("unit store is full (capacity {capacity})")]
    Capacity { capacity: usize },

    /// Another active unit already uses this id.
    #[error("unit id '{id}' is already in use")]
    DuplicateId { id: String },

    /// The unit record is malformed.
    #[error("invalid unit '{id}': {reason}")]
    InvalidSpec { id: String, reason: String },

    /// The slot does not hold an active unit.
    #[error("unit {index} is not active")]
    InactiveUnit { index: slot::UnitIndex },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::command::{
        ApplyReport, CausalReason, Command, CommandError, CommandKind, CommandQueue,
    };
    pub use crate::event::{Event, EventKind, EventPayload, EventQueue};
    pub use crate::geometry::Vec2;
    pub use crate::meta::{MetaPatch, MetaValue, PendingHit, StatusEffect, StatusKind, UnitMeta};
    pub use crate::slot::UnitIndex;
    pub use crate::snapshot::{StoreSnapshot, UnitSnapshot};
    pub use crate::store::{CapacityPolicy, UnitSpec, UnitStore, UnitView};
    pub use crate::team::{hostile, Perdurance, Team, UnitState};
    pub use crate::StoreError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
