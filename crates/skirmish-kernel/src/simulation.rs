//! The tick loop.

use std::time::{Duration, Instant};

use rand_pcg::Pcg32;
use serde::Serialize;
use tracing::debug;

use skirmish_journal::{Journal, TickRecord};
use skirmish_trigger::cache::{CacheStats, ExpressionCache};
use skirmish_units::command::CommandQueue;
use skirmish_units::event::EventQueue;
use skirmish_units::slot::UnitIndex;
use skirmish_units::snapshot::StoreSnapshot;
use skirmish_units::store::{UnitSpec, UnitStore};

use crate::abilities::AbilityBook;
use crate::config::SimConfig;
use crate::context::{TickContext, TickView};
use crate::handlers::HandlerSet;
use crate::resolver::Resolver;
use crate::rule::RuleSet;
use crate::spatial::SpatialGrid;
use crate::SimError;

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per rule, in execution order.
    pub rule_times: Vec<(String, Duration)>,
    /// Time spent in the fixpoint resolver.
    pub resolve_time: Duration,
    /// Total time for the tick.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// A deterministic skirmish simulation.
///
/// Each [`step`](Self::step) runs one tick:
///
/// 1. Index the living units in the spatial grid.
/// 2. Run every rule in order against a fresh [`TickContext`]. Rules only
///    read the store and queue commands and events.
/// 3. Drain the queues through the [`Resolver`], the only writer.
/// 4. Optionally free dead units, advance the tick counter and journal the
///    tick's streams.
///
/// Given the same config, ability book, rule and handler sets and the same
/// units added in the same order, two simulations produce identical
/// command and event streams and identical [`state_hash`](Self::state_hash)es.
pub struct Simulation {
    config: SimConfig,
    store: UnitStore,
    abilities: AbilityBook,
    rules: RuleSet,
    handlers: HandlerSet,
    resolver: Resolver,
    cache: ExpressionCache,
    grid: SpatialGrid,
    /// Reused per-tick buffer of living indices.
    living: Vec<UnitIndex>,
    commands: CommandQueue,
    events: EventQueue,
    journal: Journal,
    tick: u64,
    last_record: TickRecord,
    last_diagnostics: TickDiagnostics,
}

impl Simulation {
    /// Build a simulation with the standard rule and handler sets. Every
    /// expression in `abilities` is compiled up front.
    ///
    /// # Errors
    ///
    /// [`SimError::Config`] if `config` fails validation.
    pub fn new(config: SimConfig, abilities: AbilityBook) -> Result<Self, SimError> {
        config.validate()?;
        let mut cache = ExpressionCache::new();
        cache.warm(abilities.expressions());
        debug!(
            abilities = abilities.len(),
            expressions = cache.len(),
            seed = config.seed,
            "simulation created"
        );
        Ok(Self {
            store: UnitStore::new(config.store_capacity, config.capacity_policy),
            grid: SpatialGrid::new(config.spatial_cell_size),
            resolver: Resolver::new(config.max_resolver_iterations),
            journal: Journal::new(config.journal_depth),
            abilities,
            rules: RuleSet::standard(),
            handlers: HandlerSet::standard(),
            cache,
            living: Vec::new(),
            commands: CommandQueue::new(),
            events: EventQueue::new(),
            tick: 0,
            last_record: TickRecord::default(),
            last_diagnostics: TickDiagnostics::default(),
            config,
        })
    }

    /// Replace the rule set.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the event handler set.
    pub fn with_handlers(mut self, handlers: HandlerSet) -> Self {
        self.handlers = handlers;
        self
    }

    /// Add a unit between ticks.
    ///
    /// # Errors
    ///
    /// [`SimError::Store`] if the store rejects the spec.
    pub fn add_unit(&mut self, spec: UnitSpec) -> Result<UnitIndex, SimError> {
        Ok(self.store.add_unit(spec)?)
    }

    /// Advance exactly one tick and return its record.
    pub fn step(&mut self) -> &TickRecord {
        let tick_start = Instant::now();
        let tick = self.tick;

        self.living.clear();
        self.living.extend(self.store.living());
        self.grid.rebuild(&self.store, &self.living);
        self.commands.reset();
        self.events.reset();

        let mut rng = Pcg32::new(self.config.seed, tick);
        let mut record = TickRecord::new(tick);
        let mut rule_times = Vec::with_capacity(self.rules.len());
        {
            let view = TickView::new(&self.store, &self.grid, &self.living, tick);
            let mut ctx = TickContext::new(
                view,
                &mut rng,
                &mut self.cache,
                &self.abilities,
                &mut self.commands,
                &mut self.events,
                &mut record.diagnostics,
            );
            for rule in self.rules.iter() {
                let rule_start = Instant::now();
                rule.execute(&mut ctx);
                rule_times.push((rule.name().to_owned(), rule_start.elapsed()));
                record.rules_executed.push(rule.name().to_owned());
            }
        }

        let resolve_start = Instant::now();
        let resolution = self.resolver.resolve(
            &mut self.store,
            &mut self.commands,
            &mut self.events,
            &self.handlers,
            tick,
        );
        let resolve_time = resolve_start.elapsed();

        record.commands = resolution.commands;
        record.events = resolution.events;
        record.resolver_iterations = resolution.iterations;
        record.diagnostics.extend(resolution.diagnostic);

        self.store.recycle_retired();
        if self.config.prune_dead {
            let freed = self.store.prune_dead();
            if !freed.is_empty() {
                debug!(tick, freed = freed.len(), "pruned dead units");
            }
        }

        self.tick += 1;
        self.journal.push(record.clone());
        self.last_record = record;
        self.last_diagnostics = TickDiagnostics {
            rule_times,
            resolve_time,
            total_time: tick_start.elapsed(),
        };
        &self.last_record
    }

    /// Run `count` ticks. Returns the number of commands applied across
    /// them, successful or not.
    pub fn run_ticks(&mut self, count: u64) -> u64 {
        let mut total = 0u64;
        for _ in 0..count {
            total += self.step().commands.len() as u64;
        }
        total
    }

    // -- accessors ----------------------------------------------------------

    /// The next tick to run; equal to the number of ticks run so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn store(&self) -> &UnitStore {
        &self.store
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn abilities(&self) -> &AbilityBook {
        &self.abilities
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.names()
    }

    /// The record of the most recent tick (empty before the first step).
    pub fn last_record(&self) -> &TickRecord {
        &self.last_record
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// BLAKE3 hex digest of the tick counter and every active unit.
    pub fn state_hash(&self) -> String {
        #[derive(Serialize)]
        struct State<'a> {
            tick: u64,
            store: &'a StoreSnapshot,
        }

        let snapshot = self.store.snapshot();
        let mut hasher = blake3::Hasher::new();
        let state = State {
            tick: self.tick,
            store: &snapshot,
        };
        if let Err(e) = serde_json::to_writer(&mut hasher, &state) {
            tracing::warn!(tick = self.tick, error = %e, "state failed to serialize; hash is partial");
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("units", &self.store.len())
            .field("rules", &self.rules)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}
