//! Skirmish kernel -- a deterministic, tick-based unit simulation.
//!
//! Every tick the kernel runs a fixed, ordered [`RuleSet`](rule::RuleSet)
//! against a read-only [`TickContext`](context::TickContext). Rules never
//! write the store; they queue commands and events, which the fixpoint
//! [`Resolver`](resolver::Resolver) then drains through the event
//! [`handlers`] until nothing is left or the iteration cap is reached.
//! Randomness comes from a per-tick stream seeded by the config, so a run
//! is a pure function of its seed, abilities and initial units.
//!
//! # Quick Start
//!
//! ```
//! use skirmish_kernel::prelude::*;
//!
//! let abilities = AbilityBook::from_json(r#"{
//!     "bite": {
//!         "cooldown": 2,
//!         "trigger": "distance(closest.enemy()) <= 1.5",
//!         "effects": [{ "type": "damage", "amount": 3 }]
//!     }
//! }"#).unwrap();
//!
//! let mut sim = Simulation::new(SimConfig { seed: 42, ..Default::default() }, abilities).unwrap();
//! sim.add_unit(UnitSpec::new("wolf", Vec2::ZERO, Team::Hostile, 6.0).with_abilities(["bite"])).unwrap();
//! let sheep = sim.add_unit(UnitSpec::new("sheep", Vec2::new(1.0, 0.0), Team::Friendly, 5.0)).unwrap();
//!
//! sim.step();
//! assert_eq!(sim.store().hp(sheep), 2.0);
//! assert_eq!(sim.tick(), 1);
//! ```

#![deny(unsafe_code)]

pub mod abilities;
pub mod config;
pub mod context;
pub mod handlers;
pub mod resolver;
pub mod rule;
pub mod rules;
pub mod simulation;
pub mod spatial;

pub use simulation::Simulation;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the unit store crate for convenience.
pub use skirmish_units;

/// Re-export the trigger language crate for convenience.
pub use skirmish_trigger;

/// Re-export the journal crate for convenience.
pub use skirmish_journal;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from building or populating a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Store(#[from] skirmish_units::StoreError),

    #[error("invalid config: {reason}")]
    Config { reason: String },

    /// Ability content that failed to deserialize.
    #[error("invalid ability content: {0}")]
    Content(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common kernel usage.
pub mod prelude {
    pub use skirmish_journal::{Diagnostic, Journal, TickRecord};
    pub use skirmish_trigger::prelude::{CacheStats, CompiledExpr, ExpressionCache, Value};
    pub use skirmish_units::prelude::*;

    pub use crate::abilities::{AbilityBook, AbilityDef, Amount, Effect};
    pub use crate::config::SimConfig;
    pub use crate::context::{TickContext, TickView};
    pub use crate::handlers::{
        adjusted_damage, EventHandler, HandlerSet, HealHandler, PerduranceHandler, StatusHandler,
    };
    pub use crate::resolver::{Resolution, Resolver};
    pub use crate::rule::{Rule, RuleSet};
    pub use crate::rules::{AbilityRule, FireSpreadRule, ProjectileRule, PursuitRule, StatusEffectRule};
    pub use crate::simulation::{Simulation, TickDiagnostics};
    pub use crate::spatial::SpatialGrid;
    pub use crate::SimError;
}
