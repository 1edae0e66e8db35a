//! The read-only world a trigger expression is evaluated against.
//!
//! Expressions never see the simulation directly. They see a
//! [`TriggerEnv`] (store, living units, tick, proximity search) and a
//! [`Scope`] naming the subject (`self`) and optional `target`. The kernel
//! implements [`TriggerEnv`] on its per-tick view with a spatial grid behind
//! [`TriggerEnv::any_within`]; [`StoreEnv`] is a plain linear-scan
//! implementation over a bare store.
//!
//! The helpers here are the single definition of identifier, property,
//! noun-group and builtin semantics shared by every evaluation strategy.

use skirmish_units::geometry::Vec2;
use skirmish_units::slot::UnitIndex;
use skirmish_units::store::UnitStore;
use skirmish_units::team::hostile;

use crate::ast::{Builtin, Noun, Side};
use crate::value::Value;
use crate::EvalError;

// ---------------------------------------------------------------------------
// TriggerEnv
// ---------------------------------------------------------------------------

/// Read access to the simulation for one tick.
pub trait TriggerEnv {
    fn store(&self) -> &UnitStore;

    /// Living unit indices in ascending order.
    fn living(&self) -> &[UnitIndex];

    fn tick(&self) -> u64;

    /// Whether some living unit within `radius` of `center` satisfies `pred`.
    ///
    /// Implementations may offer candidates beyond `radius`; `pred` receives
    /// only units whose exact distance is at most `radius`.
    fn any_within(
        &self,
        center: Vec2,
        radius: f64,
        pred: &mut dyn FnMut(UnitIndex) -> bool,
    ) -> bool {
        let store = self.store();
        self.living()
            .iter()
            .any(|&i| store.pos(i).distance(center) <= radius && pred(i))
    }
}

/// A [`TriggerEnv`] over a store with no spatial index.
#[derive(Debug)]
pub struct StoreEnv<'a> {
    store: &'a UnitStore,
    living: Vec<UnitIndex>,
    tick: u64,
}

impl<'a> StoreEnv<'a> {
    pub fn new(store: &'a UnitStore, tick: u64) -> Self {
        Self {
            store,
            living: store.living().collect(),
            tick,
        }
    }
}

impl TriggerEnv for StoreEnv<'_> {
    fn store(&self) -> &UnitStore {
        self.store
    }

    fn living(&self) -> &[UnitIndex] {
        &self.living
    }

    fn tick(&self) -> u64 {
        self.tick
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Bindings for one evaluation.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub env: &'a dyn TriggerEnv,
    /// The unit bound to `self`.
    pub subject: UnitIndex,
    /// The unit bound to `target`, `null` when absent.
    pub target: Option<UnitIndex>,
}

impl<'a> Scope<'a> {
    pub fn new(env: &'a dyn TriggerEnv, subject: UnitIndex) -> Self {
        Self {
            env,
            subject,
            target: None,
        }
    }

    pub fn with_target(mut self, target: Option<UnitIndex>) -> Self {
        self.target = target;
        self
    }

    fn subject_pos(&self) -> Vec2 {
        self.env.store().pos(self.subject)
    }
}

/// Non-local exits while evaluating.
#[derive(Debug, Clone, PartialEq)]
pub enum Halt {
    /// A `?.` met a nullish receiver; the enclosing chain yields `undefined`.
    ShortCircuit,
    Error(EvalError),
}

impl From<EvalError> for Halt {
    fn from(e: EvalError) -> Self {
        Halt::Error(e)
    }
}

// ---------------------------------------------------------------------------
// Semantics
// ---------------------------------------------------------------------------

/// Resolve a bare identifier.
pub fn resolve_ident(scope: &Scope<'_>, name: &str) -> Result<Value, EvalError> {
    match name {
        "self" => Ok(Value::Unit(scope.subject)),
        "target" => Ok(scope.target.map_or(Value::Null, Value::Unit)),
        "tick" => Ok(Value::Number(scope.env.tick() as f64)),
        _ => {
            if let Some(noun) = Noun::from_name(name) {
                Ok(Value::Noun(noun))
            } else if let Some(builtin) = Builtin::from_name(name) {
                Ok(Value::Function(builtin))
            } else {
                Err(EvalError::UnknownIdentifier {
                    name: name.to_owned(),
                })
            }
        }
    }
}

/// Read `property` from `object`.
pub fn property(
    scope: &Scope<'_>,
    object: &Value,
    property: &str,
    optional: bool,
) -> Result<Value, Halt> {
    match object {
        Value::Undefined | Value::Null if optional => Err(Halt::ShortCircuit),
        Value::Undefined | Value::Null => Err(Halt::Error(EvalError::NullDereference {
            property: property.to_owned(),
        })),
        Value::Unit(index) => Ok(unit_property(scope, *index, property)),
        Value::Point(p) => Ok(match property {
            "x" => Value::Number(p.x),
            "y" => Value::Number(p.y),
            _ => Value::Undefined,
        }),
        Value::Noun(noun) => Ok(Side::from_name(property)
            .map_or(Value::Undefined, |side| Value::Selector(*noun, side))),
        _ => Ok(Value::Undefined),
    }
}

fn unit_property(scope: &Scope<'_>, index: UnitIndex, property: &str) -> Value {
    let Some(unit) = scope.env.store().get(index) else {
        return Value::Undefined;
    };
    let tick = scope.env.tick();
    match property {
        "id" => Value::Str(unit.id().to_owned()),
        "hp" => Value::Number(unit.hp()),
        "maxHp" => Value::Number(unit.max_hp()),
        "hpRatio" => Value::Number(unit.hp() / unit.max_hp()),
        "pos" => Value::Point(unit.pos()),
        "x" => Value::Number(unit.pos().x),
        "y" => Value::Number(unit.pos().y),
        "team" => Value::Str(unit.team().as_str().to_owned()),
        "state" => Value::Str(unit.state().as_str().to_owned()),
        "alive" => Value::Bool(unit.is_alive()),
        "frozen" => Value::Bool(unit.meta().frozen(tick)),
        "onFire" => Value::Bool(unit.meta().on_fire(tick)),
        "speed" => Value::Number(unit.speed()),
        other => unit
            .meta()
            .flags
            .get(other)
            .map_or(Value::Undefined, Value::from),
    }
}

/// Evaluate a noun group: the extremal living unit on `side`, or `null`.
///
/// Ties keep the unit with the lowest index.
pub fn select(scope: &Scope<'_>, noun: Noun, side: Side) -> Value {
    let store = scope.env.store();
    let me = scope.subject;
    let my_team = store.team(me);
    let origin = scope.subject_pos();

    let candidates = scope.env.living().iter().copied().filter(|&i| match side {
        Side::Ally => i != me && store.team(i) == my_team,
        Side::Enemy => hostile(my_team, store.team(i)),
    });

    // Lower score wins.
    let score = |i: UnitIndex| -> f64 {
        match noun {
            Noun::Closest => store.pos(i).distance(origin),
            Noun::Furthest => -store.pos(i).distance(origin),
            Noun::Weakest => store.hp(i),
            Noun::Strongest => -store.hp(i),
            Noun::Healthiest => -(store.hp(i) / store.max_hp(i)),
            Noun::MostInjured => -(store.max_hp(i) - store.hp(i)),
        }
    };

    let mut best: Option<(UnitIndex, f64)> = None;
    for i in candidates {
        let s = score(i);
        match best {
            Some((_, b)) if !(s < b) => {}
            _ => best = Some((i, s)),
        }
    }
    best.map_or(Value::Null, |(i, _)| Value::Unit(i))
}

/// Euclidean distance from the subject to a unit or point. `null` and
/// `undefined` are infinitely far; other values give `NaN`.
pub fn distance(scope: &Scope<'_>, to: &Value) -> f64 {
    let origin = scope.subject_pos();
    match to {
        Value::Unit(i) => match scope.env.store().get(*i) {
            Some(unit) => origin.distance(unit.pos()),
            None => f64::INFINITY,
        },
        Value::Point(p) => origin.distance(*p),
        Value::Undefined | Value::Null => f64::INFINITY,
        _ => f64::NAN,
    }
}

/// Call a callable value.
pub fn call(scope: &Scope<'_>, callee: &Value, args: &[Value]) -> Result<Value, EvalError> {
    match callee {
        Value::Selector(noun, side) => {
            arity("selector", 0, args)?;
            Ok(select(scope, *noun, *side))
        }
        Value::Function(builtin) => call_builtin(scope, *builtin, args),
        other => Err(EvalError::NotCallable {
            type_name: other.type_name(),
        }),
    }
}

fn call_builtin(scope: &Scope<'_>, builtin: Builtin, args: &[Value]) -> Result<Value, EvalError> {
    let number = |v: &Value| v.as_number().unwrap_or(f64::NAN);
    Ok(Value::Number(match builtin {
        Builtin::Distance => {
            arity(builtin.name(), 1, args)?;
            distance(scope, &args[0])
        }
        Builtin::Min | Builtin::Max => {
            if args.is_empty() {
                return Err(EvalError::BadArity {
                    function: builtin.name(),
                    expected: 1,
                    got: 0,
                });
            }
            let mut acc = number(&args[0]);
            for v in &args[1..] {
                let n = number(v);
                acc = if acc.is_nan() || n.is_nan() {
                    f64::NAN
                } else if builtin == Builtin::Min {
                    acc.min(n)
                } else {
                    acc.max(n)
                };
            }
            acc
        }
        Builtin::Abs => {
            arity(builtin.name(), 1, args)?;
            number(&args[0]).abs()
        }
        Builtin::Floor => {
            arity(builtin.name(), 1, args)?;
            number(&args[0]).floor()
        }
        Builtin::Ceil => {
            arity(builtin.name(), 1, args)?;
            number(&args[0]).ceil()
        }
        Builtin::Sqrt => {
            arity(builtin.name(), 1, args)?;
            number(&args[0]).sqrt()
        }
    }))
}

fn arity(function: &'static str, expected: usize, args: &[Value]) -> Result<(), EvalError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::BadArity {
            function,
            expected,
            got: args.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_units::prelude::*;

    fn store() -> (UnitStore, UnitIndex) {
        let mut store = UnitStore::new(8, CapacityPolicy::Reject);
        let me = store
            .add_unit(UnitSpec::new("me", Vec2::ZERO, Team::Friendly, 10.0))
            .unwrap();
        let specs = [
            ("ally_far", 9.0, Team::Friendly, 10.0, 10.0),
            ("ally_hurt", 2.0, Team::Friendly, 3.0, 10.0),
            ("foe_near", 3.0, Team::Hostile, 8.0, 8.0),
            ("foe_far", 7.0, Team::Hostile, 20.0, 30.0),
            ("bystander", 1.0, Team::Neutral, 1.0, 1.0),
        ];
        for (id, x, team, hp, max) in specs {
            store
                .add_unit(UnitSpec::new(id, Vec2::new(x, 0.0), team, hp).with_max_hp(max))
                .unwrap();
        }
        (store, me)
    }

    fn pick(scope: &Scope<'_>, noun: Noun, side: Side) -> String {
        match select(scope, noun, side) {
            Value::Unit(i) => scope.env.store().id(i).to_owned(),
            other => other.to_string(),
        }
    }

    #[test]
    fn noun_groups_pick_extremes() {
        let (store, me) = store();
        let env = StoreEnv::new(&store, 0);
        let scope = Scope::new(&env, me);
        assert_eq!(pick(&scope, Noun::Closest, Side::Enemy), "foe_near");
        assert_eq!(pick(&scope, Noun::Furthest, Side::Enemy), "foe_far");
        assert_eq!(pick(&scope, Noun::Weakest, Side::Enemy), "foe_near");
        assert_eq!(pick(&scope, Noun::Strongest, Side::Enemy), "foe_far");
        assert_eq!(pick(&scope, Noun::Healthiest, Side::Enemy), "foe_near");
        assert_eq!(pick(&scope, Noun::MostInjured, Side::Enemy), "foe_far");
        assert_eq!(pick(&scope, Noun::Closest, Side::Ally), "ally_hurt");
        assert_eq!(pick(&scope, Noun::MostInjured, Side::Ally), "ally_hurt");
    }

    #[test]
    fn neutral_units_are_never_selected_as_enemies() {
        let mut store = UnitStore::new(4, CapacityPolicy::Reject);
        let me = store
            .add_unit(UnitSpec::new("me", Vec2::ZERO, Team::Neutral, 1.0))
            .unwrap();
        store
            .add_unit(UnitSpec::new("h", Vec2::ZERO, Team::Hostile, 1.0))
            .unwrap();
        let env = StoreEnv::new(&store, 0);
        let scope = Scope::new(&env, me);
        assert_eq!(select(&scope, Noun::Closest, Side::Enemy), Value::Null);
    }

    #[test]
    fn distance_to_null_is_infinite() {
        let (store, me) = store();
        let env = StoreEnv::new(&store, 0);
        let scope = Scope::new(&env, me);
        assert_eq!(distance(&scope, &Value::Null), f64::INFINITY);
        assert_eq!(distance(&scope, &Value::Point(Vec2::new(0.0, 2.0))), 2.0);
    }

    #[test]
    fn unknown_unit_property_reads_flags() {
        let mut store = UnitStore::new(1, CapacityPolicy::Reject);
        let mut spec = UnitSpec::new("me", Vec2::ZERO, Team::Friendly, 4.0);
        spec.flags.insert("rage".into(), MetaValue::Number(2.0));
        let me = store.add_unit(spec).unwrap();
        let env = StoreEnv::new(&store, 0);
        let scope = Scope::new(&env, me);
        let unit = Value::Unit(me);
        assert_eq!(property(&scope, &unit, "rage", false), Ok(Value::Number(2.0)));
        assert_eq!(property(&scope, &unit, "nope", false), Ok(Value::Undefined));
        assert_eq!(property(&scope, &unit, "hpRatio", false), Ok(Value::Number(1.0)));
    }

    #[test]
    fn member_of_null_errors_unless_optional() {
        let (store, me) = store();
        let env = StoreEnv::new(&store, 0);
        let scope = Scope::new(&env, me);
        assert_eq!(
            property(&scope, &Value::Null, "pos", true),
            Err(Halt::ShortCircuit)
        );
        assert!(matches!(
            property(&scope, &Value::Null, "pos", false),
            Err(Halt::Error(EvalError::NullDereference { .. }))
        ));
    }

    #[test]
    fn builtins_check_arity() {
        let (store, me) = store();
        let env = StoreEnv::new(&store, 0);
        let scope = Scope::new(&env, me);
        let f = Value::Function(Builtin::Max);
        assert_eq!(
            call(&scope, &f, &[Value::Number(1.0), Value::Number(4.0)]),
            Ok(Value::Number(4.0))
        );
        assert!(call(&scope, &Value::Function(Builtin::Abs), &[]).is_err());
        assert!(call(&scope, &Value::Number(1.0), &[]).is_err());
    }
}
