//! Property tests for command application.
//!
//! Random command sequences are applied to a small store and the resulting
//! state is checked against the store invariants: dead units have no hp left,
//! healed units never exceed max hp, failed commands change nothing, and the
//! same sequence always produces the same snapshot.

use proptest::prelude::*;
use skirmish_units::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Damage(usize, f64),
    Heal(usize, f64),
    Move(usize, f64, f64),
    Freeze(usize, u64),
    Remove(usize),
    Spawn(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..8usize, 0.0..20.0f64).prop_map(|(i, a)| Op::Damage(i, a)),
        (0..8usize, 0.0..20.0f64).prop_map(|(i, a)| Op::Heal(i, a)),
        (0..8usize, -50.0..50.0f64, -50.0..50.0f64).prop_map(|(i, x, y)| Op::Move(i, x, y)),
        (0..8usize, 0..10u64).prop_map(|(i, t)| Op::Freeze(i, t)),
        (0..8usize).prop_map(Op::Remove),
        (0..6u8).prop_map(Op::Spawn),
    ]
}

fn setup() -> UnitStore {
    let mut store = UnitStore::new(6, CapacityPolicy::Reject);
    for n in 0..4 {
        let team = if n % 2 == 0 { Team::Friendly } else { Team::Hostile };
        store
            .add_unit(UnitSpec::new(format!("u{n}"), Vec2::new(n as f64, 0.0), team, 10.0))
            .unwrap();
    }
    store
}

fn build(ops: &[Op]) -> CommandQueue {
    let mut q = CommandQueue::new();
    for op in ops {
        match *op {
            Op::Damage(i, a) => q.damage(UnitIndex(i as u32), a, "physical", "prop", CausalReason::Setup),
            Op::Heal(i, a) => q.heal(UnitIndex(i as u32), a, "prop", CausalReason::Setup),
            Op::Move(i, x, y) => q.move_to(UnitIndex(i as u32), Vec2::new(x, y), false, "prop", CausalReason::Movement),
            Op::Freeze(i, t) => q.push(Command::new(
                Some(UnitIndex(i as u32)),
                CommandKind::ApplyStatus(StatusEffect {
                    kind: StatusKind::Frozen,
                    expires_at: t,
                    magnitude: 0.0,
                    source: None,
                }),
                "prop",
                CausalReason::Setup,
            )),
            Op::Remove(i) => q.push(Command::new(
                Some(UnitIndex(i as u32)),
                CommandKind::Remove,
                "prop",
                CausalReason::Setup,
            )),
            Op::Spawn(n) => q.spawn(
                UnitSpec::new(format!("s{n}"), Vec2::ZERO, Team::Neutral, 4.0),
                "prop",
                CausalReason::Setup,
            ),
        }
    }
    q
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    /// Indices are sequential, reports match outcomes, and hp/state agree.
    #[test]
    fn command_sequences_preserve_store_invariants(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut store = setup();
        let mut q = build(&ops);
        let mut events = EventQueue::new();
        let applied = q.apply(&mut store, &mut events);

        for (i, cmd) in applied.iter().enumerate() {
            prop_assert_eq!(cmd.index, i as u32);
            prop_assert_eq!(cmd.applied_successfully, cmd.failure.is_none());
            if matches!(cmd.kind, CommandKind::Spawn(_)) && cmd.applied_successfully {
                prop_assert!(cmd.spawned.is_some());
            }
        }

        // A removed slot is never handed to a spawn or hit again in the same batch.
        let mut removed = Vec::new();
        for cmd in &applied {
            if cmd.applied_successfully {
                for index in cmd.target.iter().chain(cmd.spawned.iter()) {
                    prop_assert!(!removed.contains(index), "{:?} reused after removal", index);
                }
                if matches!(cmd.kind, CommandKind::Remove) {
                    removed.extend(cmd.target);
                }
            }
        }

        let report = q.last_apply_report();
        prop_assert_eq!(report.success_count, applied.iter().filter(|c| c.applied_successfully).count());
        prop_assert_eq!(report.failed_count, applied.iter().filter(|c| !c.applied_successfully).count());
        prop_assert_eq!(report.events_emitted, events.len());

        for index in store.active() {
            let view = store.get(index).unwrap();
            if view.hp() <= 0.0 {
                prop_assert_eq!(view.state(), UnitState::Dead);
            }
            prop_assert!(view.hp() <= view.max_hp());
            prop_assert_eq!(store.index_of(view.id()), Some(index));
        }
        prop_assert!(store.len() <= store.capacity());
    }

    /// The same sequence on identical stores yields identical snapshots.
    #[test]
    fn command_application_is_deterministic(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let run = |ops: &[Op]| {
            let mut store = setup();
            let mut events = EventQueue::new();
            let applied = build(ops).apply(&mut store, &mut events);
            (store.snapshot().hash(), applied, events.drain())
        };
        prop_assert_eq!(run(&ops), run(&ops));
    }

    /// A failed command leaves the snapshot untouched.
    #[test]
    fn failed_commands_do_not_mutate(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let mut store = setup();
        let mut events = EventQueue::new();
        for cmd in build(&ops).commands().iter().cloned() {
            let before = store.snapshot();
            let mut single = CommandQueue::new();
            single.push(cmd);
            let applied = single.apply(&mut store, &mut events);
            if !applied[0].applied_successfully {
                prop_assert_eq!(store.snapshot(), before);
            }
        }
    }
}

#[test]
fn spawn_into_full_store_fails_atomically() {
    let mut store = UnitStore::new(4, CapacityPolicy::Reject);
    for n in 0..4 {
        store
            .add_unit(UnitSpec::new(format!("u{n}"), Vec2::ZERO, Team::Friendly, 1.0))
            .unwrap();
    }
    let before = store.snapshot().hash();
    let mut q = CommandQueue::new();
    q.spawn(UnitSpec::new("extra", Vec2::ZERO, Team::Friendly, 1.0), "t", CausalReason::Setup);
    let applied = q.apply(&mut store, &mut EventQueue::new());
    assert!(!applied[0].applied_successfully);
    assert_eq!(store.snapshot().hash(), before);
}

#[test]
fn grow_policy_accepts_spawn_into_full_store() {
    let mut store = UnitStore::new(1, CapacityPolicy::Grow);
    store
        .add_unit(UnitSpec::new("a", Vec2::ZERO, Team::Friendly, 1.0))
        .unwrap();
    let mut q = CommandQueue::new();
    q.spawn(UnitSpec::new("b", Vec2::ZERO, Team::Friendly, 1.0), "t", CausalReason::Setup);
    let applied = q.apply(&mut store, &mut EventQueue::new());
    assert!(applied[0].applied_successfully);
    assert_eq!(store.capacity(), 2);
}
