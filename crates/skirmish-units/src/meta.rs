//! Typed per-unit metadata.
//!
//! Each concern that rules need to persist across ticks has its own field:
//! ability cooldowns, active status effects, in-flight projectile hits. The
//! open-ended `flags` map keeps the ability to attach arbitrary transient
//! state to a unit, but values are a closed [`MetaValue`] union rather than
//! untyped blobs.
//!
//! Rules never write metadata directly. They queue a [`MetaPatch`] inside an
//! `ApplyMeta` command and the resolver applies it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MetaValue
// ---------------------------------------------------------------------------

/// A scalar stored in a unit's flag map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

// ---------------------------------------------------------------------------
// Status effects
// ---------------------------------------------------------------------------

/// The closed set of status effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    /// Fire damage every tick.
    Burning,
    /// Poison damage every tick.
    Poisoned,
    /// Cannot act or move; shatters on physical hits.
    Frozen,
    /// Cannot act or move.
    Stunned,
    /// One-shot lightning damage on application.
    Shock,
    /// Observation only: emitted when a unit dies, never stored.
    Dead,
}

impl StatusKind {
    /// Damage aspect dealt every tick while the status is active.
    pub fn tick_aspect(self) -> Option<&'static str> {
        match self {
            StatusKind::Burning => Some("fire"),
            StatusKind::Poisoned => Some("poison"),
            _ => None,
        }
    }

    /// Damage aspect dealt once when the status lands.
    pub fn on_apply_aspect(self) -> Option<&'static str> {
        match self {
            StatusKind::Shock => Some("lightning"),
            _ => None,
        }
    }

    /// Whether the status prevents the unit from acting.
    pub fn disables(self) -> bool {
        matches!(self, StatusKind::Frozen | StatusKind::Stunned)
    }
}

/// An active status on a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    /// First tick on which the status is no longer active.
    pub expires_at: u64,
    /// Damage per tick for damage-over-time statuses, one-shot damage for
    /// on-apply statuses; unused otherwise.
    #[serde(default)]
    pub magnitude: f64,
    /// Id of the unit that applied the status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl StatusEffect {
    /// Whether the status is still in force at `tick`.
    pub fn active_at(&self, tick: u64) -> bool {
        tick < self.expires_at
    }
}

// ---------------------------------------------------------------------------
// PendingHit
// ---------------------------------------------------------------------------

/// A projectile hit in flight toward the unit that carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingHit {
    pub arrive_tick: u64,
    pub amount: f64,
    pub aspect: String,
    /// Id of the unit that fired.
    pub source: String,
}

// ---------------------------------------------------------------------------
// UnitMeta
// ---------------------------------------------------------------------------

/// Persistent per-unit state owned by rules.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitMeta {
    /// Ability id -> tick on which it was last used.
    pub cooldowns: BTreeMap<String, u64>,
    /// Active status effects, at most one per kind.
    pub statuses: Vec<StatusEffect>,
    /// Projectile hits in flight toward this unit, in firing order.
    pub incoming: Vec<PendingHit>,
    /// Free-form transient flags.
    pub flags: BTreeMap<String, MetaValue>,
}

impl UnitMeta {
    /// The active status of `kind`, if any.
    pub fn status(&self, kind: StatusKind, tick: u64) -> Option<&StatusEffect> {
        self.statuses
            .iter()
            .find(|s| s.kind == kind && s.active_at(tick))
    }

    /// Whether the unit is frozen at `tick`.
    pub fn frozen(&self, tick: u64) -> bool {
        self.status(StatusKind::Frozen, tick).is_some()
    }

    /// Whether the unit is burning at `tick`.
    pub fn on_fire(&self, tick: u64) -> bool {
        self.status(StatusKind::Burning, tick).is_some()
    }

    /// Whether any active status prevents the unit from acting.
    pub fn disabled(&self, tick: u64) -> bool {
        self.statuses
            .iter()
            .any(|s| s.kind.disables() && s.active_at(tick))
    }

    /// Tick on which `ability` was last used.
    pub fn last_used(&self, ability: &str) -> Option<u64> {
        self.cooldowns.get(ability).copied()
    }

    /// Apply a patch in place.
    pub fn apply(&mut self, patch: &MetaPatch) {
        match patch {
            MetaPatch::SetCooldown { ability, tick } => {
                self.cooldowns.insert(ability.clone(), *tick);
            }
            MetaPatch::SetFlag { key, value } => {
                self.flags.insert(key.clone(), value.clone());
            }
            MetaPatch::ClearFlag { key } => {
                self.flags.remove(key);
            }
            MetaPatch::AddStatus(status) => {
                match self.statuses.iter_mut().find(|s| s.kind == status.kind) {
                    Some(existing) => {
                        existing.expires_at = existing.expires_at.max(status.expires_at);
                        existing.magnitude = existing.magnitude.max(status.magnitude);
                        existing.source = status.source.clone();
                    }
                    None => self.statuses.push(status.clone()),
                }
            }
            MetaPatch::RemoveStatus { kind } => {
                self.statuses.retain(|s| s.kind != *kind);
            }
            MetaPatch::QueueHit(hit) => self.incoming.push(hit.clone()),
            MetaPatch::ClearArrivedHits { tick } => {
                self.incoming.retain(|h| h.arrive_tick > *tick);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MetaPatch
// ---------------------------------------------------------------------------

/// A typed metadata mutation, carried by an `ApplyMeta` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MetaPatch {
    SetCooldown { ability: String, tick: u64 },
    SetFlag { key: String, value: MetaValue },
    ClearFlag { key: String },
    AddStatus(StatusEffect),
    RemoveStatus { kind: StatusKind },
    QueueHit(PendingHit),
    /// Drop every pending hit whose arrival tick is at or before `tick`.
    ClearArrivedHits { tick: u64 },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
