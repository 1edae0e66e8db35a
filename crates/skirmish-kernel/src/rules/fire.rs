//! Fire spreading between neighbouring units.

use skirmish_units::event::Event;
use skirmish_units::meta::{StatusEffect, StatusKind};

use crate::context::TickContext;
use crate::rule::Rule;

const NAME: &str = "fire_spread";

/// Each burning unit may ignite every living unit near it that is not
/// already burning.
///
/// Burners are visited by index, then their neighbours by index, with one
/// draw from the tick's random stream per candidate, so the outcome depends
/// only on the seed and the store.
#[derive(Debug, Clone)]
pub struct FireSpreadRule {
    pub radius: f64,
    /// Probability of igniting each candidate.
    pub chance: f64,
    /// Ticks the new fire lasts.
    pub duration: u64,
    /// Fire damage per tick.
    pub magnitude: f64,
}

impl Default for FireSpreadRule {
    fn default() -> Self {
        Self {
            radius: 1.5,
            chance: 0.25,
            duration: 5,
            magnitude: 1.0,
        }
    }
}

impl Rule for FireSpreadRule {
    fn name(&self) -> &str {
        NAME
    }

    fn execute(&self, ctx: &mut TickContext<'_>) {
        let view = ctx.view;
        let tick = ctx.tick();
        let mut near = Vec::new();
        for burner in view.units() {
            if !burner.meta().on_fire(tick) {
                continue;
            }
            view.neighbours(burner.pos(), self.radius, &mut near);
            for &index in &near {
                if index == burner.index() {
                    continue;
                }
                let Some(other) = view.unit_at(index) else {
                    continue;
                };
                if other.meta().on_fire(tick) {
                    continue;
                }
                if ctx.random() < self.chance {
                    let fire = StatusEffect {
                        kind: StatusKind::Burning,
                        expires_at: tick.saturating_add(self.duration),
                        magnitude: self.magnitude,
                        source: Some(burner.id().to_owned()),
                    };
                    ctx.queue_event(Event::status(Some(burner.id()), other.id(), fire, NAME));
                }
            }
        }
    }
}
