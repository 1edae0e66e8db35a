//! Hand-matched expression shapes answered without walking the tree.
//!
//! The shapes are the ones ability triggers use most: constant conditions,
//! "is an enemy within K" written as a distance comparison, and the bare
//! closest-enemy target. Each shape is answered with exactly the value the
//! interpreter would produce, including `null` when the interpreter would
//! hit a null dereference.

use skirmish_units::team::hostile;

use crate::ast::{BinOp, Expr, Literal, Noun, Side};
use crate::env::{self, Scope};
use crate::value::{self, Value};

/// How the distance call reaches the enemy's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reach {
    /// `distance(closest.enemy())`
    Unit,
    /// `distance(closest.enemy().pos)`, an error when there is no enemy.
    Pos,
    /// `distance(closest.enemy()?.pos)`
    OptionalPos,
}

/// A recognised shape.
#[derive(Debug, Clone, PartialEq)]
pub enum FastPath {
    /// An expression that reads no state.
    Constant(Value),
    /// `distance(closest.enemy()) <= K` and its `<` / mirrored forms.
    EnemyWithin {
        radius: f64,
        inclusive: bool,
        reach: Reach,
    },
    /// `closest.enemy()`
    ClosestEnemy,
}

impl FastPath {
    /// Recognise `expr`, if it has one of the supported shapes.
    pub fn recognise(expr: &Expr) -> Option<FastPath> {
        if let Some(v) = fold_constant(expr) {
            return Some(FastPath::Constant(v));
        }
        if is_closest_enemy_call(expr) {
            return Some(FastPath::ClosestEnemy);
        }
        let Expr::Binary { op, left, right } = expr else {
            return None;
        };
        let (call, bound, inclusive) = match op {
            BinOp::Le => (left, right, true),
            BinOp::Lt => (left, right, false),
            BinOp::Ge => (right, left, true),
            BinOp::Gt => (right, left, false),
            _ => return None,
        };
        let Expr::Literal(Literal::Number(radius)) = **bound else {
            return None;
        };
        // With no enemy the distance is infinite, and `inf <= inf` holds.
        if !radius.is_finite() {
            return None;
        }
        let reach = closest_enemy_distance_reach(call)?;
        Some(FastPath::EnemyWithin {
            radius,
            inclusive,
            reach,
        })
    }

    pub fn evaluate(&self, scope: &Scope<'_>) -> Value {
        match self {
            FastPath::Constant(v) => v.clone(),
            FastPath::ClosestEnemy => env::select(scope, Noun::Closest, Side::Enemy),
            FastPath::EnemyWithin {
                radius,
                inclusive,
                reach,
            } => {
                let store = scope.env.store();
                let team = store.team(scope.subject);
                let origin = store.pos(scope.subject);
                let found = scope.env.any_within(origin, *radius, &mut |i| {
                    hostile(team, store.team(i))
                        && (*inclusive || store.pos(i).distance(origin) < *radius)
                });
                if found {
                    Value::Bool(true)
                } else if *reach == Reach::Pos
                    && !scope
                        .env
                        .living()
                        .iter()
                        .any(|&i| hostile(team, store.team(i)))
                {
                    Value::Null
                } else {
                    Value::Bool(false)
                }
            }
        }
    }
}

/// `closest.enemy()` / `nearest.enemy()`.
fn is_closest_enemy_call(expr: &Expr) -> bool {
    let Expr::Call { callee, args } = expr else {
        return false;
    };
    if !args.is_empty() {
        return false;
    }
    let Expr::Member {
        object, property, ..
    } = &**callee
    else {
        return false;
    };
    matches!(&**object, Expr::Ident(n) if Noun::from_name(n) == Some(Noun::Closest))
        && property == "enemy"
}

/// Match `distance(<closest enemy>[.pos | ?.pos])`.
pub(crate) fn closest_enemy_distance_reach(expr: &Expr) -> Option<Reach> {
    let arg = distance_argument(expr)?;
    if is_closest_enemy_call(arg) {
        return Some(Reach::Unit);
    }
    match arg {
        Expr::Member {
            object,
            property,
            optional: false,
        } if property == "pos" && is_closest_enemy_call(object) => Some(Reach::Pos),
        Expr::OptionalChain(inner) => match &**inner {
            Expr::Member {
                object,
                property,
                optional: true,
            } if property == "pos" && is_closest_enemy_call(object) => Some(Reach::OptionalPos),
            _ => None,
        },
        _ => None,
    }
}

/// The single argument of a `distance(..)` call.
pub(crate) fn distance_argument(expr: &Expr) -> Option<&Expr> {
    match expr {
        Expr::Call { callee, args } if args.len() == 1 => {
            matches!(&**callee, Expr::Ident(n) if n == "distance").then(|| &args[0])
        }
        _ => None,
    }
}

/// Evaluate an expression whose value does not depend on any state.
///
/// The skipped side of a decided `&&`/`||` may be anything, since it is
/// never evaluated.
pub fn fold_constant(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Literal(lit) => Some(Value::from(lit)),
        Expr::Unary { op, operand } => {
            let v = fold_constant(operand)?;
            Some(value::unary(*op, &v))
        }
        Expr::Binary { op, left, right } => {
            let l = fold_constant(left)?;
            match op {
                BinOp::And if !l.truthy() => Some(l),
                BinOp::Or if l.truthy() => Some(l),
                BinOp::And | BinOp::Or => fold_constant(right),
                _ => {
                    let r = fold_constant(right)?;
                    Some(value::binary(*op, &l, &r))
                }
            }
        }
        _ => None,
    }
}
