//! Walking toward the nearest enemy.

use skirmish_trigger::value::Value;
use skirmish_units::command::CausalReason;
use skirmish_units::team::UnitState;

use crate::context::TickContext;
use crate::rule::Rule;

const NAME: &str = "pursuit";

/// Mobile units that can act close in on their closest enemy while
/// `trigger` holds, moving at most `speed` per tick. A walking unit whose
/// trigger stops holding goes back to idle.
#[derive(Debug, Clone)]
pub struct PursuitRule {
    pub trigger: String,
}

impl Default for PursuitRule {
    fn default() -> Self {
        Self {
            trigger: "distance(closest.enemy()) > 1.5".to_owned(),
        }
    }
}

impl Rule for PursuitRule {
    fn name(&self) -> &str {
        NAME
    }

    fn execute(&self, ctx: &mut TickContext<'_>) {
        let view = ctx.view;
        let tick = ctx.tick();
        let trigger = ctx.expression(&self.trigger);
        let quarry = ctx.expression("closest.enemy()");

        for unit in view.units() {
            if unit.speed() <= 0.0 || unit.meta().disabled(tick) {
                continue;
            }
            let scope = view.scope(unit.index());
            let chase = if trigger.test(&scope) {
                match quarry.evaluate(&scope) {
                    Value::Unit(enemy) => view.unit_at(enemy),
                    _ => None,
                }
            } else {
                None
            };

            match chase {
                Some(enemy) => {
                    let to = unit.pos().step_toward(enemy.pos(), unit.speed());
                    ctx.commands()
                        .move_to(unit.index(), to, false, NAME, CausalReason::Movement);
                    if unit.state() != UnitState::Walk {
                        ctx.commands().set_state(
                            unit.index(),
                            UnitState::Walk,
                            NAME,
                            CausalReason::Movement,
                        );
                    }
                }
                None if unit.state() == UnitState::Walk => {
                    ctx.commands().set_state(
                        unit.index(),
                        UnitState::Idle,
                        NAME,
                        CausalReason::Movement,
                    );
                }
                None => {}
            }
        }
    }
}
