//! Trigger evaluation cost per strategy.
//!
//! Compares, for the same expressions over the same store:
//!
//! - the cached compiled form (fast path, closures or interpreter);
//! - walking an already-parsed tree;
//! - `evaluate_source`, which re-parses on every call.
//!
//! Run with: `cargo bench --bench trigger_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use skirmish_trigger::interpreter;
use skirmish_trigger::prelude::*;
use skirmish_units::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `count` units on a square lattice, alternating friendly and hostile.
fn lattice(count: usize) -> UnitStore {
    let mut store = UnitStore::new(count, CapacityPolicy::Reject);
    let side = (count as f64).sqrt().ceil() as usize;
    for i in 0..count {
        let pos = Vec2::new((i % side) as f64 * 2.0, (i / side) as f64 * 2.0);
        let team = if i % 2 == 0 { Team::Friendly } else { Team::Hostile };
        let hp = 5.0 + (i % 7) as f64;
        store
            .add_unit(UnitSpec::new(format!("u{i}"), pos, team, hp).with_max_hp(12.0))
            .unwrap();
    }
    store
}

const EXPRESSIONS: &[(&str, &str)] = &[
    ("enemy_within", "distance(closest.enemy()) <= 4"),
    ("hp_ratio", "self.hp / self.maxHp < 0.5 && tick > 2"),
    ("weakest_optional", "weakest.enemy()?.hp < 8"),
    ("builtin_call", "min(self.hp, distance(furthest.enemy())) > 3"),
];

// ---------------------------------------------------------------------------
// Benchmark 1: strategies side by side at 200 units
// ---------------------------------------------------------------------------

fn bench_strategies(c: &mut Criterion) {
    let store = lattice(200);
    let env = StoreEnv::new(&store, 10);
    let scope = Scope::new(&env, UnitIndex(0));
    let mut cache = ExpressionCache::new();

    for &(name, src) in EXPRESSIONS {
        let mut group = c.benchmark_group(name);
        let compiled = cache.get(src);
        let ast = parse(src).unwrap();

        group.bench_function("cached", |b| b.iter(|| black_box(compiled.evaluate(&scope))));
        group.bench_function("tree_walk", |b| {
            b.iter(|| black_box(interpreter::evaluate(&ast, &scope)))
        });
        group.bench_function("reparse", |b| {
            b.iter(|| black_box(evaluate_source(src, &scope)))
        });
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Benchmark 2: noun-group selection scaling
// ---------------------------------------------------------------------------

fn bench_selection_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("closest_enemy_scaling");
    let compiled = CompiledExpr::compile("closest.enemy()");

    for &count in &[50usize, 200, 1000] {
        let store = lattice(count);
        let env = StoreEnv::new(&store, 0);
        let scope = Scope::new(&env, UnitIndex(0));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &_count| {
            b.iter(|| black_box(compiled.evaluate(&scope)));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark 3: compilation
// ---------------------------------------------------------------------------

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_all", |b| {
        b.iter(|| {
            for &(_, src) in EXPRESSIONS {
                black_box(CompiledExpr::compile(src));
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_strategies, bench_selection_scaling, bench_compile);
criterion_main!(benches);
