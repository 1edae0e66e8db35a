//! Landing projectiles.

use skirmish_units::command::CausalReason;
use skirmish_units::event::Event;
use skirmish_units::meta::MetaPatch;

use crate::context::TickContext;
use crate::rule::Rule;

const NAME: &str = "projectiles";

/// Hits whose arrival tick has come turn into damage events, in firing
/// order; the arrived entries are then cleared from the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectileRule;

impl Rule for ProjectileRule {
    fn name(&self) -> &str {
        NAME
    }

    fn execute(&self, ctx: &mut TickContext<'_>) {
        let view = ctx.view;
        let tick = ctx.tick();
        for unit in view.units() {
            let mut landed = false;
            for hit in unit.meta().incoming.iter().filter(|h| h.arrive_tick <= tick) {
                ctx.queue_event(Event::damage(
                    Some(&hit.source),
                    unit.id(),
                    hit.amount,
                    &hit.aspect,
                    "projectile",
                ));
                landed = true;
            }
            if landed {
                ctx.commands().apply_meta(
                    unit.index(),
                    MetaPatch::ClearArrivedHits { tick },
                    NAME,
                    CausalReason::Projectile,
                );
            }
        }
    }
}
