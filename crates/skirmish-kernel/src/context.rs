//! Per-tick access for rules.
//!
//! A [`TickContext`] is built at the start of every tick and dropped before
//! the resolver runs, so nothing a rule sees can outlive the tick. It splits
//! into two halves:
//!
//! - [`TickView`]: shared, `Copy` read access (store, spatial grid, living
//!   units, tick number). It implements
//!   [`TriggerEnv`](skirmish_trigger::env::TriggerEnv), so trigger
//!   expressions evaluate against it directly.
//! - the write half: the tick's random stream, the expression cache and
//!   the command/event queues.
//!
//! Rules copy `ctx.view` out before building evaluation scopes, which lets
//! them keep queueing commands while a scope is alive.

use std::sync::Arc;

use rand::Rng;
use rand_pcg::Pcg32;
use tracing::warn;

use skirmish_journal::Diagnostic;
use skirmish_trigger::cache::ExpressionCache;
use skirmish_trigger::compiler::CompiledExpr;
use skirmish_trigger::env::{Scope, TriggerEnv};
use skirmish_units::command::{Command, CommandQueue};
use skirmish_units::event::{Event, EventQueue};
use skirmish_units::geometry::Vec2;
use skirmish_units::slot::UnitIndex;
use skirmish_units::store::{UnitStore, UnitView};

use crate::abilities::{AbilityBook, Amount};
use crate::spatial::SpatialGrid;

// ---------------------------------------------------------------------------
// TickView
// ---------------------------------------------------------------------------

/// Read-only state for one tick.
#[derive(Clone, Copy)]
pub struct TickView<'a> {
    store: &'a UnitStore,
    grid: &'a SpatialGrid,
    living: &'a [UnitIndex],
    tick: u64,
}

impl<'a> TickView<'a> {
    /// `grid` must index exactly the units in `living`.
    pub fn new(store: &'a UnitStore, grid: &'a SpatialGrid, living: &'a [UnitIndex], tick: u64) -> Self {
        Self {
            store,
            grid,
            living,
            tick,
        }
    }

    /// Views over the living units, ascending by index. Nothing is copied.
    pub fn units(&self) -> impl Iterator<Item = UnitView<'a>> + 'a {
        let store = self.store;
        self.living.iter().filter_map(move |&i| store.get(i))
    }

    pub fn unit_at(&self, index: UnitIndex) -> Option<UnitView<'a>> {
        self.store.get(index)
    }

    /// Living units within `radius` of `center`, ascending, into `out`.
    pub fn neighbours(&self, center: Vec2, radius: f64, out: &mut Vec<UnitIndex>) {
        self.grid.within(self.store, center, radius, out);
    }

    /// An evaluation scope with `subject` bound to `self`.
    pub fn scope(&self, subject: UnitIndex) -> Scope<'_> {
        Scope::new(self, subject)
    }
}

impl TriggerEnv for TickView<'_> {
    fn store(&self) -> &UnitStore {
        self.store
    }

    fn living(&self) -> &[UnitIndex] {
        self.living
    }

    fn tick(&self) -> u64 {
        self.tick
    }

    fn any_within(
        &self,
        center: Vec2,
        radius: f64,
        pred: &mut dyn FnMut(UnitIndex) -> bool,
    ) -> bool {
        let store = self.store;
        self.grid.visit(center, radius, &mut |i| {
            store.pos(i).distance(center) <= radius && pred(i)
        })
    }
}

// ---------------------------------------------------------------------------
// TickContext
// ---------------------------------------------------------------------------

/// Everything a [`Rule`](crate::rule::Rule) may touch during one tick.
pub struct TickContext<'a> {
    pub view: TickView<'a>,
    rng: &'a mut Pcg32,
    cache: &'a mut ExpressionCache,
    abilities: &'a AbilityBook,
    commands: &'a mut CommandQueue,
    events: &'a mut EventQueue,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a> TickContext<'a> {
    pub fn new(
        view: TickView<'a>,
        rng: &'a mut Pcg32,
        cache: &'a mut ExpressionCache,
        abilities: &'a AbilityBook,
        commands: &'a mut CommandQueue,
        events: &'a mut EventQueue,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            view,
            rng,
            cache,
            abilities,
            commands,
            events,
            diagnostics,
        }
    }

    pub fn tick(&self) -> u64 {
        self.view.tick
    }

    pub fn store(&self) -> &'a UnitStore {
        self.view.store
    }

    pub fn units(&self) -> impl Iterator<Item = UnitView<'a>> + 'a {
        self.view.units()
    }

    pub fn unit_at(&self, index: UnitIndex) -> Option<UnitView<'a>> {
        self.view.unit_at(index)
    }

    pub fn abilities(&self) -> &'a AbilityBook {
        self.abilities
    }

    /// A uniform draw in `[0, 1)` from the tick's stream.
    pub fn random(&mut self) -> f64 {
        self.rng.gen()
    }

    pub fn roll(&mut self, amount: &Amount) -> f64 {
        amount.roll(&mut *self.rng)
    }

    /// The compiled form of a trigger expression.
    pub fn expression(&mut self, source: &str) -> Arc<CompiledExpr> {
        self.cache.get(source)
    }

    pub fn queue_command(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    /// The command queue, for its typed helpers.
    pub fn commands(&mut self) -> &mut CommandQueue {
        self.commands
    }

    pub fn queue_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Log and record a content error. The caller skips the offending piece.
    pub fn content_warning(&mut self, unit: Option<&str>, message: String) {
        warn!(tick = self.view.tick, unit = unit.unwrap_or("-"), "{message}");
        self.diagnostics.push(Diagnostic::ContentWarning {
            unit: unit.map(str::to_owned),
            message,
        });
    }
}
