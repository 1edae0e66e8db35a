//! Built-in rules, in their standard execution order.

pub mod ability;
pub mod fire;
pub mod projectile;
pub mod pursuit;
pub mod status;

pub use ability::AbilityRule;
pub use fire::FireSpreadRule;
pub use projectile::ProjectileRule;
pub use pursuit::PursuitRule;
pub use status::StatusEffectRule;

use skirmish_units::meta::StatusKind;

/// Event origin for damage dealt by a status.
pub(crate) fn status_origin(kind: StatusKind) -> String {
    format!("status:{kind:?}").to_lowercase()
}

/// Run one rule against `store` and return what it queued.
#[cfg(test)]
pub(crate) fn run_rule(
    rule: &dyn crate::rule::Rule,
    store: &skirmish_units::store::UnitStore,
    book: &crate::abilities::AbilityBook,
    tick: u64,
) -> (
    Vec<skirmish_units::command::Command>,
    Vec<skirmish_units::event::Event>,
    Vec<skirmish_journal::Diagnostic>,
) {
    use rand::SeedableRng;

    let living: Vec<_> = store.living().collect();
    let mut grid = crate::spatial::SpatialGrid::new(4.0);
    grid.rebuild(store, &living);
    let mut rng = rand_pcg::Pcg32::seed_from_u64(tick);
    let mut cache = skirmish_trigger::cache::ExpressionCache::new();
    let mut commands = skirmish_units::command::CommandQueue::new();
    let mut events = skirmish_units::event::EventQueue::new();
    let mut diagnostics = Vec::new();
    let mut ctx = crate::context::TickContext::new(
        crate::context::TickView::new(store, &grid, &living, tick),
        &mut rng,
        &mut cache,
        book,
        &mut commands,
        &mut events,
        &mut diagnostics,
    );
    rule.execute(&mut ctx);
    (commands.commands().to_vec(), events.drain(), diagnostics)
}

/// Inflict `status` on `unit` directly, as if an earlier tick had applied it.
#[cfg(test)]
pub(crate) fn afflict(
    store: &mut skirmish_units::store::UnitStore,
    unit: skirmish_units::slot::UnitIndex,
    status: skirmish_units::meta::StatusEffect,
) {
    use skirmish_units::command::{CausalReason, Command, CommandKind, CommandQueue};

    let mut commands = CommandQueue::new();
    commands.push(Command::new(
        Some(unit),
        CommandKind::ApplyStatus(status),
        "test",
        CausalReason::Setup,
    ));
    commands.apply(store, &mut skirmish_units::event::EventQueue::new());
}
