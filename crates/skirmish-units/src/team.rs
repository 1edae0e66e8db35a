//! Team allegiance, lifecycle state, and damage-resistance categories.
//!
//! Hostility is a pure function of two [`Team`] values:
//!
//! - identical teams are never hostile to each other;
//! - [`Team::Neutral`] is never hostile to anyone, including other teams;
//! - any other pair of distinct teams is hostile.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// Allegiance of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    /// The player's side.
    Friendly,
    /// The opposing side.
    Hostile,
    /// Bystanders, wildlife, props.
    Neutral,
}

impl Team {
    /// Every team, in declaration order.
    pub const ALL: [Team; 3] = [Team::Friendly, Team::Hostile, Team::Neutral];

    /// Lowercase name, as exposed to trigger expressions.
    pub fn as_str(self) -> &'static str {
        match self {
            Team::Friendly => "friendly",
            Team::Hostile => "hostile",
            Team::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether units on teams `a` and `b` are enemies.
#[inline]
pub fn hostile(a: Team, b: Team) -> bool {
    a != b && a != Team::Neutral && b != Team::Neutral
}

// ---------------------------------------------------------------------------
// UnitState
// ---------------------------------------------------------------------------

/// Coarse lifecycle state of a unit, consumed mostly by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    #[default]
    Idle,
    Walk,
    Attack,
    Cast,
    Stunned,
    Dead,
}

impl UnitState {
    /// Lowercase name, as exposed to trigger expressions.
    pub fn as_str(self) -> &'static str {
        match self {
            UnitState::Idle => "idle",
            UnitState::Walk => "walk",
            UnitState::Attack => "attack",
            UnitState::Cast => "cast",
            UnitState::Stunned => "stunned",
            UnitState::Dead => "dead",
        }
    }
}

// ---------------------------------------------------------------------------
// Perdurance
// ---------------------------------------------------------------------------

/// A unit's categorical damage-resistance policy.
///
/// The policy itself is applied by the kernel's damage handler; the store only
/// records which category a unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Perdurance {
    /// Takes damage as dealt.
    #[default]
    None,
    /// Every hit is capped at one point.
    Sturdiness,
    /// Immaterial: physical hits pass through.
    Spectral,
    /// Infernal: immune to fire, weak to radiance, resilient otherwise.
    Fiendish,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
