//! Ability evaluation.
//!
//! For every living unit that can act, for each ability it carries, in
//! order:
//!
//! 1. skip while the ability is cooling down;
//! 2. skip when the trigger has an enemy range bound and no enemy is that
//!    close (the trigger would be false anyway);
//! 3. evaluate the trigger; stop unless truthy;
//! 4. evaluate the target expression to a unit, a point or nothing;
//! 5. interpret the effect list against (caster, target);
//! 6. record the use tick for the cooldown.

use serde_json::json;

use skirmish_trigger::env::TriggerEnv;
use skirmish_trigger::value::Value;
use skirmish_units::command::CausalReason;
use skirmish_units::event::Event;
use skirmish_units::geometry::Vec2;
use skirmish_units::meta::{MetaPatch, PendingHit, StatusEffect};
use skirmish_units::slot::UnitIndex;
use skirmish_units::store::{UnitSpec, UnitView};
use skirmish_units::team::{hostile, UnitState};

use crate::abilities::{AbilityDef, Effect};
use crate::context::{TickContext, TickView};
use crate::rule::Rule;

const NAME: &str = "abilities";

/// What an ability's target expression resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Unit(UnitIndex),
    Point(Vec2),
    Nothing,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AbilityRule;

impl Rule for AbilityRule {
    fn name(&self) -> &str {
        NAME
    }

    fn execute(&self, ctx: &mut TickContext<'_>) {
        let view = ctx.view;
        let tick = ctx.tick();
        let book = ctx.abilities();
        let store = view.store();
        let mut scratch = Vec::new();

        for caster in view.units() {
            if caster.meta().disabled(tick) {
                continue;
            }
            for ability in caster.abilities() {
                let Some(def) = book.get(ability) else {
                    ctx.content_warning(Some(caster.id()), format!("unknown ability '{ability}'"));
                    continue;
                };
                if def.cooling_down(caster.meta().last_used(ability), tick) {
                    continue;
                }

                let trigger = ctx.expression(&def.trigger);
                if let Some(range) = trigger.enemy_range_bound() {
                    let team = caster.team();
                    if !view.any_within(caster.pos(), range, &mut |i| hostile(team, store.team(i))) {
                        continue;
                    }
                }
                let scope = view.scope(caster.index());
                if !trigger.test(&scope) {
                    continue;
                }

                let target = match ctx.expression(&def.target).evaluate(&scope) {
                    Value::Unit(i) if view.unit_at(i).is_some() => Target::Unit(i),
                    Value::Point(p) => Target::Point(p),
                    _ => Target::Nothing,
                };
                tracing::trace!(tick, unit = %caster.id(), ability = %def.name, ?target, "ability fires");

                for effect in &def.effects {
                    apply_effect(ctx, &view, caster, def, effect, target, &mut scratch);
                }

                let reason = CausalReason::Ability(def.name.clone());
                ctx.commands().apply_meta(
                    caster.index(),
                    MetaPatch::SetCooldown {
                        ability: ability.clone(),
                        tick,
                    },
                    NAME,
                    reason.clone(),
                );
                let offensive = def.effects.iter().any(|e| {
                    matches!(e, Effect::Damage { .. } | Effect::Aoe { .. } | Effect::Projectile { .. })
                });
                let state = if offensive { UnitState::Attack } else { UnitState::Cast };
                if caster.state() != state {
                    ctx.commands().set_state(caster.index(), state, NAME, reason);
                }
            }
        }
    }
}

fn apply_effect(
    ctx: &mut TickContext<'_>,
    view: &TickView<'_>,
    caster: UnitView<'_>,
    def: &AbilityDef,
    effect: &Effect,
    target: Target,
    scratch: &mut Vec<UnitIndex>,
) {
    let tick = ctx.tick();
    let origin = format!("ability:{}", def.name);
    let reason = || CausalReason::Ability(def.name.clone());
    let target_unit = match target {
        Target::Unit(i) => view.unit_at(i),
        _ => None,
    };
    let target_pos = match target {
        Target::Unit(i) => view.unit_at(i).map_or(caster.pos(), |u| u.pos()),
        Target::Point(p) => p,
        Target::Nothing => caster.pos(),
    };

    if effect.needs_unit() && target_unit.is_none() {
        tracing::debug!(unit = %caster.id(), ability = %def.name, "effect needs a unit target; skipped");
        return;
    }

    match effect {
        Effect::Damage { amount, aspect } => {
            if let Some(t) = target_unit {
                let amount = ctx.roll(amount);
                ctx.queue_event(Event::damage(Some(caster.id()), t.id(), amount, aspect, &origin));
            }
        }
        Effect::Heal { amount } => {
            if let Some(t) = target_unit {
                let amount = ctx.roll(amount);
                ctx.queue_event(Event::heal(Some(caster.id()), t.id(), amount, &origin));
            }
        }
        Effect::Aoe {
            radius,
            amount,
            aspect,
        } => {
            let amount = ctx.roll(amount);
            view.neighbours(target_pos, *radius, scratch);
            for &i in scratch.iter() {
                let Some(victim) = view.unit_at(i) else {
                    continue;
                };
                if hostile(caster.team(), victim.team()) {
                    ctx.queue_event(Event::damage(Some(caster.id()), victim.id(), amount, aspect, &origin));
                }
            }
        }
        Effect::Projectile {
            amount,
            aspect,
            speed,
        } => {
            if let Some(t) = target_unit {
                let amount = ctx.roll(amount);
                let distance = caster.pos().distance(t.pos());
                let flight = if *speed > 0.0 && speed.is_finite() {
                    (distance / speed).ceil() as u64
                } else {
                    0
                };
                let arrive_tick = tick.saturating_add(flight.max(1));
                ctx.commands().apply_meta(
                    t.index(),
                    MetaPatch::QueueHit(PendingHit {
                        arrive_tick,
                        amount,
                        aspect: aspect.clone(),
                        source: caster.id().to_owned(),
                    }),
                    NAME,
                    reason(),
                );
                ctx.commands().cue(
                    "projectile",
                    caster.pos(),
                    json!({ "from": caster.id(), "to": t.id(), "arrive_tick": arrive_tick }),
                    NAME,
                    reason(),
                );
            }
        }
        Effect::Summon {
            unit,
            hp,
            count,
            abilities,
            speed,
        } => {
            for n in 0..*count {
                let id = format!("{}/{}/{unit}#{tick}.{n}", caster.id(), def.name);
                let pos = caster.pos();
                let offset = 0.5 * (f64::from(n) + 1.0);
                let spec = UnitSpec::new(id, Vec2::new(pos.x + offset, pos.y), caster.team(), *hp)
                    .with_abilities(abilities.iter().cloned())
                    .with_speed(*speed);
                ctx.commands().spawn(spec, NAME, reason());
            }
        }
        Effect::Status {
            status,
            duration,
            magnitude,
        } => {
            if let Some(t) = target_unit {
                let effect = StatusEffect {
                    kind: *status,
                    expires_at: tick.saturating_add(*duration),
                    magnitude: *magnitude,
                    source: Some(caster.id().to_owned()),
                };
                ctx.queue_event(Event::status(Some(caster.id()), t.id(), effect, &origin));
            }
        }
        Effect::Weather { kind, duration } => {
            ctx.commands().cue(
                "weather",
                caster.pos(),
                json!({ "kind": kind, "until": tick.saturating_add(*duration) }),
                NAME,
                reason(),
            );
        }
        Effect::Particles { kind } => {
            ctx.commands()
                .cue("particles", target_pos, json!({ "kind": kind }), NAME, reason());
        }
        Effect::Unknown => {
            ctx.content_warning(
                Some(caster.id()),
                format!("ability '{}' has an effect of unknown type; skipped", def.name),
            );
        }
    }
}
