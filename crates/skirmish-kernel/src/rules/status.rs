//! Damage over time and status expiry.

use skirmish_units::command::CausalReason;
use skirmish_units::event::Event;
use skirmish_units::meta::{MetaPatch, StatusKind};
use skirmish_units::team::UnitState;

use crate::context::TickContext;
use crate::rule::Rule;
use crate::rules::status_origin;

const NAME: &str = "status_effects";

/// Per living unit, in index order:
///
/// - every active damage-over-time status queues a damage event;
/// - every expired status is removed;
/// - a stunned unit with no active disabling status returns to idle.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusEffectRule;

impl Rule for StatusEffectRule {
    fn name(&self) -> &str {
        NAME
    }

    fn execute(&self, ctx: &mut TickContext<'_>) {
        let view = ctx.view;
        let tick = ctx.tick();
        for unit in view.units() {
            let meta = unit.meta();
            for status in &meta.statuses {
                if status.active_at(tick) {
                    if let Some(aspect) = status.kind.tick_aspect() {
                        ctx.queue_event(Event::damage(
                            status.source.as_deref(),
                            unit.id(),
                            status.magnitude,
                            aspect,
                            &status_origin(status.kind),
                        ));
                    }
                } else {
                    ctx.commands().apply_meta(
                        unit.index(),
                        MetaPatch::RemoveStatus { kind: status.kind },
                        NAME,
                        CausalReason::StatusEffect(status.kind),
                    );
                }
            }

            if unit.state() == UnitState::Stunned && !meta.disabled(tick) {
                let expired = meta
                    .statuses
                    .iter()
                    .find(|s| s.kind.disables())
                    .map_or(StatusKind::Stunned, |s| s.kind);
                ctx.commands().set_state(
                    unit.index(),
                    UnitState::Idle,
                    NAME,
                    CausalReason::StatusEffect(expired),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::AbilityBook;
    use crate::rules::{afflict, run_rule};
    use skirmish_units::prelude::*;

    fn status(kind: StatusKind, expires_at: u64, magnitude: f64) -> StatusEffect {
        StatusEffect {
            kind,
            expires_at,
            magnitude,
            source: Some("witch".into()),
        }
    }

    fn victim(statuses: &[StatusEffect]) -> (UnitStore, UnitIndex) {
        let mut store = UnitStore::new(2, CapacityPolicy::Reject);
        let v = store
            .add_unit(UnitSpec::new("victim", Vec2::ZERO, Team::Friendly, 10.0))
            .unwrap();
        for s in statuses {
            afflict(&mut store, v, s.clone());
        }
        (store, v)
    }

    #[test]
    fn active_dots_hurt_and_expired_statuses_go() {
        let (store, _) = victim(&[
            status(StatusKind::Burning, 5, 2.0),
            status(StatusKind::Poisoned, 3, 1.0),
        ]);
        let (commands, events, _) = run_rule(&StatusEffectRule, &store, &AbilityBook::new(), 3);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload.aspect.as_deref(), Some("fire"));
        assert_eq!(events[0].payload.amount, 2.0);
        assert_eq!(events[0].payload.origin, "status:burning");
        assert_eq!(events[0].source.as_deref(), Some("witch"));

        assert_eq!(commands.len(), 1);
        assert_eq!(
            commands[0].kind,
            CommandKind::ApplyMeta(MetaPatch::RemoveStatus {
                kind: StatusKind::Poisoned
            })
        );
    }

    #[test]
    fn thawed_unit_returns_to_idle() {
        let (store, v) = victim(&[status(StatusKind::Frozen, 2, 0.0)]);
        assert_eq!(store.state(v), UnitState::Stunned);

        let (commands, _, _) = run_rule(&StatusEffectRule, &store, &AbilityBook::new(), 1);
        assert!(commands.is_empty());

        let (commands, _, _) = run_rule(&StatusEffectRule, &store, &AbilityBook::new(), 2);
        let kinds: Vec<&CommandKind> = commands.iter().map(|c| &c.kind).collect();
        assert_eq!(
            kinds,
            [
                &CommandKind::ApplyMeta(MetaPatch::RemoveStatus {
                    kind: StatusKind::Frozen
                }),
                &CommandKind::SetState {
                    state: UnitState::Idle
                },
            ]
        );
        assert_eq!(commands[1].reason, CausalReason::StatusEffect(StatusKind::Frozen));
    }
}
