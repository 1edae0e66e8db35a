//! Headless skirmish -- a small battle printed tick by tick.
//!
//! Run with:
//!   cargo run --example headless_skirmish -p skirmish-kernel -- [seed] [ticks]
//!
//! Set `RUST_LOG=skirmish_kernel=debug` to watch rules and the resolver.

use anyhow::Context;
use skirmish_kernel::prelude::*;

const ABILITIES: &str = r#"{
    "slash":    { "cooldown": 1, "trigger": "distance(closest.enemy()) <= 1.5",
                  "effects": [{ "type": "damage", "amount": [2, 4] }] },
    "volley":   { "cooldown": 3, "trigger": "distance(closest.enemy()) <= 8",
                  "effects": [{ "type": "projectile", "amount": [1, 3], "speed": 4 }] },
    "smite":    { "cooldown": 4, "trigger": "distance(weakest.enemy()?.pos) <= 6",
                  "target": "weakest.enemy()",
                  "effects": [{ "type": "damage", "amount": 5, "aspect": "radiant" },
                              { "type": "particles", "kind": "halo" }] },
    "hellfire": { "cooldown": 5, "trigger": "distance(closest.enemy()) <= 5",
                  "effects": [{ "type": "aoe", "radius": 2.5, "amount": [2, 4], "aspect": "fire" },
                              { "type": "status", "status": "burning", "duration": 3, "magnitude": 1 }] },
    "raise":    { "cooldown": 10, "trigger": "self.hpRatio < 0.75",
                  "effects": [{ "type": "summon", "unit": "ghoul", "hp": 5, "count": 2,
                                "abilities": ["slash"], "speed": 1 }] }
}"#;

// ---------------------------------------------------------------------------
// Scene setup
// ---------------------------------------------------------------------------

fn scene() -> Vec<UnitSpec> {
    vec![
        UnitSpec::new("paladin", Vec2::new(0.0, 0.0), Team::Friendly, 30.0)
            .with_speed(1.0)
            .with_abilities(["slash", "smite"]),
        UnitSpec::new("ranger", Vec2::new(-2.0, 2.0), Team::Friendly, 16.0).with_abilities(["volley"]),
        UnitSpec::new("golem", Vec2::new(-1.0, -2.0), Team::Friendly, 8.0)
            .with_speed(0.5)
            .with_abilities(["slash"])
            .with_perdurance(Perdurance::Sturdiness),
        UnitSpec::new("demon", Vec2::new(9.0, 0.0), Team::Hostile, 26.0)
            .with_speed(0.75)
            .with_abilities(["hellfire", "raise"])
            .with_perdurance(Perdurance::Fiendish),
        UnitSpec::new("shade", Vec2::new(7.0, 3.0), Team::Hostile, 12.0)
            .with_speed(1.5)
            .with_abilities(["slash"])
            .with_perdurance(Perdurance::Spectral),
    ]
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let seed = match args.next() {
        Some(s) => s.parse().context("seed must be an integer")?,
        None => 42,
    };
    let ticks: u64 = match args.next() {
        Some(s) => s.parse().context("ticks must be an integer")?,
        None => 30,
    };

    let config = SimConfig {
        seed,
        capacity_policy: CapacityPolicy::Grow,
        store_capacity: 16,
        ..SimConfig::default()
    };
    let abilities = AbilityBook::from_json(ABILITIES).context("loading abilities")?;
    let mut sim = Simulation::new(config, abilities)?;
    for spec in scene() {
        sim.add_unit(spec)?;
    }

    for _ in 0..ticks {
        let record = sim.step();
        let applied = record.commands.iter().filter(|c| c.applied_successfully).count();
        println!(
            "tick {:>3}  commands {:>3} ({} ok)  events {:>3}  passes {}",
            record.tick,
            record.commands.len(),
            applied,
            record.events.len(),
            record.resolver_iterations,
        );
        for event in &record.events {
            if event.kind == EventKind::Status {
                if let Some(status) = &event.payload.status {
                    println!("           {} <- {:?}", event.target, status.kind);
                }
            }
        }

        let store = sim.store();
        let alive = |team: Team| store.living().filter(|&i| store.team(i) == team).count();
        if alive(Team::Friendly) == 0 || alive(Team::Hostile) == 0 {
            break;
        }
    }

    println!();
    let store = sim.store();
    for i in store.active() {
        println!(
            "{:<24} {:<8} hp {:>5.1}/{:<5.1} at ({:.1}, {:.1})",
            store.id(i),
            store.team(i).as_str(),
            store.hp(i),
            store.max_hp(i),
            store.pos(i).x,
            store.pos(i).y,
        );
    }

    let stats = sim.cache_stats();
    println!(
        "\nexpressions: {} hits, {} misses ({} fast path, {} compiled, {} interpreted)",
        stats.hits, stats.misses, stats.fast_path, stats.compiled, stats.interpreted
    );
    println!("state hash after tick {}: {}", sim.tick(), sim.state_hash());
    Ok(())
}
