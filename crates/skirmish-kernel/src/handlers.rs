//! Event handlers: turning semantic events into commands.
//!
//! The resolver dispatches every event to each handler in order. Handlers
//! read the store as it stands after the commands applied so far this pass
//! and queue the resulting commands for the next pass.

use tracing::{debug, trace};

use skirmish_units::command::{CausalReason, Command, CommandKind, CommandQueue};
use skirmish_units::event::{Event, EventKind};
use skirmish_units::meta::StatusKind;
use skirmish_units::slot::UnitIndex;
use skirmish_units::store::UnitStore;
use skirmish_units::team::Perdurance;

// ---------------------------------------------------------------------------
// EventHandler
// ---------------------------------------------------------------------------

/// Turns events into commands.
pub trait EventHandler {
    fn name(&self) -> &str;

    /// Inspect `event` and queue any resulting commands.
    fn handle(&self, event: &Event, store: &UnitStore, tick: u64, commands: &mut CommandQueue);
}

/// Handlers in dispatch order.
#[derive(Default)]
pub struct HandlerSet {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Perdurance, heal, status.
    pub fn standard() -> Self {
        Self::new()
            .with(PerduranceHandler)
            .with(HealHandler)
            .with(StatusHandler)
    }

    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Offer `event` to every handler in order.
    pub fn dispatch(&self, event: &Event, store: &UnitStore, tick: u64, commands: &mut CommandQueue) {
        for handler in &self.handlers {
            handler.handle(event, store, tick, commands);
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// The living unit an event targets, if any.
fn living_target(event: &Event, store: &UnitStore) -> Option<UnitIndex> {
    let index = store.index_of(&event.target);
    match index {
        Some(i) if store.is_alive(i) => Some(i),
        _ => {
            debug!(target = %event.target, kind = ?event.kind, "event target gone or dead; ignored");
            None
        }
    }
}

fn response(event: &Event) -> CausalReason {
    CausalReason::EventResponse {
        kind: event.kind,
        event_index: event.index,
    }
}

// ---------------------------------------------------------------------------
// Damage
// ---------------------------------------------------------------------------

/// The damage a unit actually takes from a hit of `amount` and `aspect`.
///
/// Frozen targets shatter: physical hits deal half again as much. The
/// perdurance policy applies after that:
///
/// | perdurance   | effect                                      |
/// |--------------|---------------------------------------------|
/// | `none`       | unchanged                                   |
/// | `sturdiness` | capped at 1                                 |
/// | `spectral`   | physical hits do nothing                    |
/// | `fiendish`   | fire does nothing, radiant x2, all else x0.5 |
pub fn adjusted_damage(perdurance: Perdurance, aspect: &str, amount: f64, frozen: bool) -> f64 {
    let amount = amount.max(0.0);
    let amount = if frozen && aspect == "physical" {
        amount * 1.5
    } else {
        amount
    };
    match perdurance {
        Perdurance::None => amount,
        Perdurance::Sturdiness => amount.min(1.0),
        Perdurance::Spectral if aspect == "physical" => 0.0,
        Perdurance::Spectral => amount,
        Perdurance::Fiendish => match aspect {
            "fire" => 0.0,
            "radiant" => amount * 2.0,
            _ => amount * 0.5,
        },
    }
}

/// Damage events become `Damage` commands sized by the target's perdurance.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerduranceHandler;

impl EventHandler for PerduranceHandler {
    fn name(&self) -> &str {
        "perdurance"
    }

    fn handle(&self, event: &Event, store: &UnitStore, tick: u64, commands: &mut CommandQueue) {
        if event.kind != EventKind::Damage {
            return;
        }
        let Some(target) = living_target(event, store) else {
            return;
        };
        let aspect = event.payload.aspect.as_deref().unwrap_or("physical");
        let amount = adjusted_damage(
            store.perdurance(target),
            aspect,
            event.payload.amount,
            store.meta(target).frozen(tick),
        );
        if amount <= 0.0 {
            trace!(target = %event.target, aspect, "hit fully resisted");
            return;
        }
        commands.push(Command::new(
            Some(target),
            CommandKind::Damage {
                amount,
                aspect: aspect.to_owned(),
                source: event.source.clone(),
            },
            self.name(),
            response(event),
        ));
    }
}

// ---------------------------------------------------------------------------
// Heal / Status
// ---------------------------------------------------------------------------

/// Heal events become `Heal` commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealHandler;

impl EventHandler for HealHandler {
    fn name(&self) -> &str {
        "heal"
    }

    fn handle(&self, event: &Event, store: &UnitStore, _tick: u64, commands: &mut CommandQueue) {
        if event.kind != EventKind::Heal {
            return;
        }
        if let Some(target) = living_target(event, store) {
            commands.heal(target, event.payload.amount.max(0.0), self.name(), response(event));
        }
    }
}

/// Status events become `ApplyStatus` commands. Death notices are
/// observation only, and fiendish units cannot burn.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusHandler;

impl EventHandler for StatusHandler {
    fn name(&self) -> &str {
        "status"
    }

    fn handle(&self, event: &Event, store: &UnitStore, _tick: u64, commands: &mut CommandQueue) {
        if event.kind != EventKind::Status {
            return;
        }
        let Some(status) = &event.payload.status else {
            return;
        };
        if status.kind == StatusKind::Dead {
            return;
        }
        let Some(target) = living_target(event, store) else {
            return;
        };
        if status.kind == StatusKind::Burning && store.perdurance(target) == Perdurance::Fiendish {
            trace!(target = %event.target, "fiendish unit shrugs off fire");
            return;
        }
        commands.push(Command::new(
            Some(target),
            CommandKind::ApplyStatus(status.clone()),
            self.name(),
            response(event),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_units::prelude::*;

    #[test]
    fn damage_policy_table() {
        use Perdurance::*;
        assert_eq!(adjusted_damage(None, "physical", 7.0, false), 7.0);
        assert_eq!(adjusted_damage(Sturdiness, "fire", 12.0, false), 1.0);
        assert_eq!(adjusted_damage(Sturdiness, "fire", 0.5, false), 0.5);
        assert_eq!(adjusted_damage(Spectral, "physical", 9.0, false), 0.0);
        assert_eq!(adjusted_damage(Spectral, "radiant", 9.0, false), 9.0);
        assert_eq!(adjusted_damage(Fiendish, "fire", 9.0, false), 0.0);
        assert_eq!(adjusted_damage(Fiendish, "radiant", 3.0, false), 6.0);
        assert_eq!(adjusted_damage(Fiendish, "poison", 3.0, false), 1.5);
        assert_eq!(adjusted_damage(None, "physical", 4.0, true), 6.0);
        assert_eq!(adjusted_damage(None, "fire", 4.0, true), 4.0);
        assert_eq!(adjusted_damage(Sturdiness, "physical", 4.0, true), 1.0);
        assert_eq!(adjusted_damage(None, "physical", -3.0, false), 0.0);
    }

    fn store_with(perdurance: Perdurance) -> UnitStore {
        let mut store = UnitStore::new(4, CapacityPolicy::Reject);
        store
            .add_unit(UnitSpec::new("imp", Vec2::ZERO, Team::Hostile, 8.0).with_perdurance(perdurance))
            .unwrap();
        store
            .add_unit(UnitSpec::new("ghost", Vec2::ZERO, Team::Hostile, 0.0).with_max_hp(5.0))
            .unwrap();
        store
    }

    #[test]
    fn perdurance_handler_sizes_damage_commands() {
        let store = store_with(Perdurance::Sturdiness);
        let mut commands = CommandQueue::new();
        let hit = Event::damage(Some("hero"), "imp", 11.0, "physical", "test");
        HandlerSet::standard().dispatch(&hit, &store, 0, &mut commands);
        assert_eq!(commands.len(), 1);
        let cmd = &commands.commands()[0];
        assert_eq!(
            cmd.kind,
            CommandKind::Damage {
                amount: 1.0,
                aspect: "physical".into(),
                source: Some("hero".into())
            }
        );
        assert_eq!(cmd.issued_by, "perdurance");
    }

    #[test]
    fn immune_and_dead_targets_produce_nothing() {
        let store = store_with(Perdurance::Fiendish);
        let mut commands = CommandQueue::new();
        let handlers = HandlerSet::standard();
        handlers.dispatch(&Event::damage(None, "imp", 5.0, "fire", "t"), &store, 0, &mut commands);
        handlers.dispatch(&Event::damage(None, "ghost", 5.0, "physical", "t"), &store, 0, &mut commands);
        handlers.dispatch(&Event::heal(None, "ghost", 5.0, "t"), &store, 0, &mut commands);
        handlers.dispatch(&Event::damage(None, "nobody", 5.0, "physical", "t"), &store, 0, &mut commands);
        let burn = StatusEffect {
            kind: StatusKind::Burning,
            expires_at: 9,
            magnitude: 1.0,
            source: None,
        };
        handlers.dispatch(&Event::status(None, "imp", burn, "t"), &store, 0, &mut commands);
        assert!(commands.is_empty());
    }

    #[test]
    fn status_and_heal_events_become_commands() {
        let store = store_with(Perdurance::None);
        let mut commands = CommandQueue::new();
        let handlers = HandlerSet::standard();
        let frost = StatusEffect {
            kind: StatusKind::Frozen,
            expires_at: 4,
            magnitude: 0.0,
            source: None,
        };
        handlers.dispatch(&Event::status(None, "imp", frost.clone(), "t"), &store, 0, &mut commands);
        handlers.dispatch(&Event::heal(None, "imp", 2.0, "t"), &store, 0, &mut commands);
        let death = StatusEffect {
            kind: StatusKind::Dead,
            ..frost.clone()
        };
        handlers.dispatch(&Event::status(None, "imp", death, "t"), &store, 0, &mut commands);
        let kinds: Vec<&CommandKind> = commands.commands().iter().map(|c| &c.kind).collect();
        assert_eq!(
            kinds,
            vec![&CommandKind::ApplyStatus(frost), &CommandKind::Heal { amount: 2.0 }]
        );
    }
}
