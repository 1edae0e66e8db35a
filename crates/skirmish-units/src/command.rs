//! Command queue with causality metadata for deferred store mutations.
//!
//! The [`CommandQueue`] collects mutation requests during a tick. Each command
//! carries the name of the rule that issued it and a [`CausalReason`]. Commands
//! are applied in strict FIFO order by [`CommandQueue::apply`].
//!
//! # Atomicity
//!
//! Applying one command validates everything it needs before writing
//! anything. A command that fails leaves the store exactly as it was and is
//! reported with its error; the rest of the queue still applies.
//!
//! # Example
//!
//! ```
//! use skirmish_units::prelude::*;
//!
//! let mut store = UnitStore::new(8, CapacityPolicy::Reject);
//! let knight = store
//!     .add_unit(UnitSpec::new("knight", Vec2::new(0.0, 0.0), Team::Friendly, 10.0))
//!     .unwrap();
//!
//! let mut cmds = CommandQueue::new();
//! let mut events = EventQueue::new();
//! cmds.damage(knight, 4.0, "physical", "test", CausalReason::Setup);
//!
//! let applied = cmds.apply(&mut store, &mut events);
//! assert_eq!(applied.len(), 1);
//! assert_eq!(store.hp(knight), 6.0);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::event::{Event, EventKind, EventQueue};
use crate::geometry::Vec2;
use crate::meta::{MetaPatch, StatusEffect, StatusKind};
use crate::slot::UnitIndex;
use crate::store::{UnitSpec, UnitStore};
use crate::team::UnitState;
use crate::StoreError;

// ---------------------------------------------------------------------------
// CausalReason
// ---------------------------------------------------------------------------

/// Why a command was issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cause", content = "detail", rename_all = "snake_case")]
pub enum CausalReason {
    /// An ability fired (ability id).
    Ability(String),
    /// A status effect ticked or expired.
    StatusEffect(StatusKind),
    /// Environmental rule (e.g. `"fire_spread"`).
    Environment(String),
    /// Produced while handling an event.
    EventResponse { kind: EventKind, event_index: u32 },
    /// Unit movement.
    Movement,
    /// A projectile arrived.
    Projectile,
    /// Scenario setup or tests.
    Setup,
}

// ---------------------------------------------------------------------------
// CommandKind
// ---------------------------------------------------------------------------

/// What mutation to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    /// Relocate the target. `teleport` tells the renderer not to interpolate.
    Move { to: Vec2, teleport: bool },
    /// Subtract hp. A unit whose hp drops to zero or below dies.
    Damage {
        amount: f64,
        aspect: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    /// Add hp, never above max hp.
    Heal { amount: f64 },
    /// Mutate the target's metadata.
    ApplyMeta(MetaPatch),
    /// Inflict a status effect.
    ApplyStatus(StatusEffect),
    /// Change lifecycle state. Dead units cannot change state.
    SetState { state: UnitState },
    /// Create a new unit.
    Spawn(UnitSpec),
    /// Take the target out of the store. The slot is only reused after the
    /// tick, once the store's retired slots are recycled.
    Remove,
    /// Presentation cue for renderers/audio (weather, particles, projectile
    /// flight). Does not touch the store.
    Cue {
        kind: String,
        at: Vec2,
        #[serde(default)]
        detail: serde_json::Value,
    },
}

// ---------------------------------------------------------------------------
// CommandError
// ---------------------------------------------------------------------------

/// Why a command could not be applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("command requires a target unit")]
    MissingTarget,
    #[error("target {index} is not an active unit")]
    UnknownTarget { index: UnitIndex },
    #[error("target {index} is dead")]
    DeadTarget { index: UnitIndex },
    #[error("invalid amount {amount}")]
    InvalidAmount { amount: f64 },
    #[error("invalid destination")]
    InvalidDestination,
    #[error("status '{kind:?}' cannot be applied directly")]
    ObservationOnly { kind: StatusKind },
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A single deferred mutation with causality metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Which unit this command targets. `None` for spawns and cues.
    pub target: Option<UnitIndex>,
    pub kind: CommandKind,
    /// Name of the rule or handler that issued the command.
    pub issued_by: String,
    pub reason: CausalReason,
    /// Sequential index within the tick (set on insertion).
    pub index: u32,
    /// Id of the target unit, resolved when the command is applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// For spawns: the index the new unit received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawned: Option<UnitIndex>,
    /// Whether the command mutated the store (or, for cues, was emitted).
    #[serde(default)]
    pub applied_successfully: bool,
    /// Error text when application failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl Command {
    /// Build an unqueued command. The index is assigned on push.
    pub fn new(
        target: Option<UnitIndex>,
        kind: CommandKind,
        issued_by: &str,
        reason: CausalReason,
    ) -> Self {
        Self {
            target,
            kind,
            issued_by: issued_by.to_owned(),
            reason,
            index: 0,
            target_id: None,
            spawned: None,
            applied_successfully: false,
            failure: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ApplyReport
// ---------------------------------------------------------------------------

/// Summary of the last [`CommandQueue::apply`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub success_count: usize,
    pub failed_count: usize,
    /// Events enqueued as a side effect of applying.
    pub events_emitted: usize,
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// Collects commands and applies them in insertion order.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    commands: Vec<Command>,
    next_index: u32,
    last_apply_report: ApplyReport,
}

impl CommandQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a `Move` command.
    pub fn move_to(
        &mut self,
        target: UnitIndex,
        to: Vec2,
        teleport: bool,
        issued_by: &str,
        reason: CausalReason,
    ) {
        self.push(Command::new(
            Some(target),
            CommandKind::Move { to, teleport },
            issued_by,
            reason,
        ));
    }

    /// Queue a `Damage` command.
    pub fn damage(
        &mut self,
        target: UnitIndex,
        amount: f64,
        aspect: &str,
        issued_by: &str,
        reason: CausalReason,
    ) {
        self.push(Command::new(
            Some(target),
            CommandKind::Damage {
                amount,
                aspect: aspect.to_owned(),
                source: None,
            },
            issued_by,
            reason,
        ));
    }

    /// Queue a `Heal` command.
    pub fn heal(&mut self, target: UnitIndex, amount: f64, issued_by: &str, reason: CausalReason) {
        self.push(Command::new(
            Some(target),
            CommandKind::Heal { amount },
            issued_by,
            reason,
        ));
    }

    /// Queue an `ApplyMeta` command.
    pub fn apply_meta(
        &mut self,
        target: UnitIndex,
        patch: MetaPatch,
        issued_by: &str,
        reason: CausalReason,
    ) {
        self.push(Command::new(
            Some(target),
            CommandKind::ApplyMeta(patch),
            issued_by,
            reason,
        ));
    }

    /// Queue a `SetState` command.
    pub fn set_state(
        &mut self,
        target: UnitIndex,
        state: UnitState,
        issued_by: &str,
        reason: CausalReason,
    ) {
        self.push(Command::new(
            Some(target),
            CommandKind::SetState { state },
            issued_by,
            reason,
        ));
    }

    /// Queue a `Spawn` command.
    pub fn spawn(&mut self, spec: UnitSpec, issued_by: &str, reason: CausalReason) {
        self.push(Command::new(None, CommandKind::Spawn(spec), issued_by, reason));
    }

    /// Queue a presentation `Cue`.
    pub fn cue(
        &mut self,
        kind: &str,
        at: Vec2,
        detail: serde_json::Value,
        issued_by: &str,
        reason: CausalReason,
    ) {
        self.push(Command::new(
            None,
            CommandKind::Cue {
                kind: kind.to_owned(),
                at,
                detail,
            },
            issued_by,
            reason,
        ));
    }

    /// Queue a pre-built command, stamping its index.
    pub fn push(&mut self, mut cmd: Command) {
        cmd.index = self.next_index;
        self.next_index += 1;
        self.commands.push(cmd);
    }

    /// Move every command from `other` into this queue, in order.
    pub fn extend(&mut self, other: impl IntoIterator<Item = Command>) {
        for cmd in other {
            self.push(cmd);
        }
    }

    /// Queued commands in insertion order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Report from the last [`apply`](Self::apply) call.
    pub fn last_apply_report(&self) -> &ApplyReport {
        &self.last_apply_report
    }

    /// Drop queued commands, keeping index numbering.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Drop queued commands and restart index numbering (tick boundary).
    pub fn reset(&mut self) {
        self.commands.clear();
        self.next_index = 0;
    }

    /// Apply every currently queued command to the store in insertion order.
    ///
    /// Events produced by application are appended to `events`. Returns all
    /// commands (successful and failed) with `target_id`, `spawned`,
    /// `applied_successfully` and `failure` filled in.
    pub fn apply(&mut self, store: &mut UnitStore, events: &mut EventQueue) -> Vec<Command> {
        let mut commands = std::mem::take(&mut self.commands);
        let events_before = events.len();
        let mut success_count = 0;
        let mut failed_count = 0;

        for cmd in &mut commands {
            cmd.target_id = cmd
                .target
                .filter(|&i| store.is_active(i))
                .map(|i| store.id(i).to_owned());
            match apply_one(store, events, cmd) {
                Ok(()) => {
                    cmd.applied_successfully = true;
                    success_count += 1;
                    tracing::trace!(index = cmd.index, kind = ?cmd.kind, "command applied");
                }
                Err(e) => {
                    failed_count += 1;
                    cmd.failure = Some(e.to_string());
                    if matches!(e, CommandError::DeadTarget { .. }) {
                        debug!(index = cmd.index, issued_by = %cmd.issued_by, "command skipped: {e}");
                    } else {
                        warn!(
                            command_index = cmd.index,
                            target = ?cmd.target,
                            issued_by = %cmd.issued_by,
                            error = %e,
                            "command application failed"
                        );
                    }
                }
            }
        }

        self.last_apply_report = ApplyReport {
            success_count,
            failed_count,
            events_emitted: events.len().saturating_sub(events_before),
        };
        commands
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

fn active_target(store: &UnitStore, cmd: &Command) -> Result<UnitIndex, CommandError> {
    let index = cmd.target.ok_or(CommandError::MissingTarget)?;
    if !store.is_active(index) {
        return Err(CommandError::UnknownTarget { index });
    }
    Ok(index)
}

fn living_target(store: &UnitStore, cmd: &Command) -> Result<UnitIndex, CommandError> {
    let index = active_target(store, cmd)?;
    if !store.is_alive(index) {
        return Err(CommandError::DeadTarget { index });
    }
    Ok(index)
}

fn apply_one(
    store: &mut UnitStore,
    events: &mut EventQueue,
    cmd: &mut Command,
) -> Result<(), CommandError> {
    match &cmd.kind {
        CommandKind::Move { to, .. } => {
            let index = living_target(store, cmd)?;
            if !to.is_finite() {
                return Err(CommandError::InvalidDestination);
            }
            store.set_pos(index, *to);
        }
        CommandKind::Damage {
            amount,
            aspect,
            source,
        } => {
            let index = living_target(store, cmd)?;
            if !amount.is_finite() {
                return Err(CommandError::InvalidAmount { amount: *amount });
            }
            let hp = store.hp(index) - amount;
            store.set_hp(index, hp);
            if hp <= 0.0 {
                store.set_state(index, UnitState::Dead);
                let death = StatusEffect {
                    kind: StatusKind::Dead,
                    expires_at: u64::MAX,
                    magnitude: 0.0,
                    source: source.clone(),
                };
                let id = store.id(index).to_owned();
                events.push(Event::status(source.as_deref(), &id, death, aspect));
            }
        }
        CommandKind::Heal { amount } => {
            let index = living_target(store, cmd)?;
            if !(amount.is_finite() && *amount >= 0.0) {
                return Err(CommandError::InvalidAmount { amount: *amount });
            }
            let (hp, max_hp) = (store.hp(index), store.max_hp(index));
            if hp < max_hp {
                store.set_hp(index, (hp + amount).min(max_hp));
            }
        }
        CommandKind::ApplyMeta(patch) => {
            let index = active_target(store, cmd)?;
            store.meta_mut(index).apply(patch);
        }
        CommandKind::ApplyStatus(status) => {
            let index = living_target(store, cmd)?;
            if status.kind == StatusKind::Dead {
                return Err(CommandError::ObservationOnly { kind: status.kind });
            }
            store
                .meta_mut(index)
                .apply(&MetaPatch::AddStatus(status.clone()));
            if status.kind.disables() {
                store.set_state(index, UnitState::Stunned);
            }
            if let Some(aspect) = status.kind.on_apply_aspect() {
                let id = store.id(index).to_owned();
                let origin = format!("status:{:?}", status.kind).to_lowercase();
                events.push(Event::damage(
                    status.source.as_deref(),
                    &id,
                    status.magnitude,
                    aspect,
                    &origin,
                ));
            }
        }
        CommandKind::SetState { state } => {
            let index = living_target(store, cmd)?;
            store.set_state(index, *state);
        }
        CommandKind::Spawn(spec) => {
            store.check_spawn(spec)?;
            let index = store.add_unit(spec.clone())?;
            cmd.spawned = Some(index);
        }
        CommandKind::Remove => {
            let index = active_target(store, cmd)?;
            store.retire(index)?;
        }
        CommandKind::Cue { .. } => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
