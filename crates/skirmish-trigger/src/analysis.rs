//! Static analysis used by the ability pre-filter.

use crate::ast::{BinOp, Expr, Literal, Noun, Side};
use crate::fast_path::distance_argument;

/// A radius `K` such that whenever the expression is truthy, some living
/// enemy of the subject lies within distance `K` of it.
///
/// When no enemy is that close the caller may skip evaluation entirely and
/// treat the trigger as false. Recognised shapes:
///
/// - `distance(<noun>.enemy()) <= K` and `<`, with optional `.pos` / `?.pos`
///   on the selected unit, and the mirrored `K >= distance(..)` forms. Any
///   noun works, since every noun's `.enemy()` selects an enemy.
/// - `a && b`: the smaller bound of whichever sides have one.
/// - `a || b`: the larger bound, only when both sides have one.
///
/// Anything else has no bound.
pub fn enemy_range_bound(expr: &Expr) -> Option<f64> {
    let Expr::Binary { op, left, right } = expr else {
        return None;
    };
    match op {
        BinOp::And => match (enemy_range_bound(left), enemy_range_bound(right)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        },
        BinOp::Or => Some(enemy_range_bound(left)?.max(enemy_range_bound(right)?)),
        BinOp::Le | BinOp::Lt => comparison_bound(left, right),
        BinOp::Ge | BinOp::Gt => comparison_bound(right, left),
        _ => None,
    }
}

/// `near` must be a distance-to-enemy call and `far` a finite literal.
fn comparison_bound(near: &Expr, far: &Expr) -> Option<f64> {
    let Expr::Literal(Literal::Number(k)) = far else {
        return None;
    };
    if !k.is_finite() {
        return None;
    }
    let arg = distance_argument(near)?;
    is_enemy_reference(arg).then_some(*k)
}

/// `<noun>.enemy()`, optionally followed by `.pos` or `?.pos`.
fn is_enemy_reference(expr: &Expr) -> bool {
    match expr {
        Expr::OptionalChain(inner) => is_enemy_reference(inner),
        Expr::Member {
            object, property, ..
        } if property == "pos" => is_enemy_selector_call(object),
        other => is_enemy_selector_call(other),
    }
}

fn is_enemy_selector_call(expr: &Expr) -> bool {
    let Expr::Call { callee, args } = expr else {
        return false;
    };
    let Expr::Member {
        object, property, ..
    } = &**callee
    else {
        return false;
    };
    args.is_empty()
        && Side::from_name(property) == Some(Side::Enemy)
        && matches!(&**object, Expr::Ident(n) if Noun::from_name(n).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn bound(src: &str) -> Option<f64> {
        enemy_range_bound(&parse(src).unwrap())
    }

    #[test]
    fn simple_and_mirrored_comparisons() {
        assert_eq!(bound("distance(closest.enemy()) <= 3"), Some(3.0));
        assert_eq!(bound("distance(weakest.enemy()?.pos) < 8"), Some(8.0));
        assert_eq!(bound("5 >= distance(furthest.enemy().pos)"), Some(5.0));
    }

    #[test]
    fn conjunction_takes_tightest_known_bound() {
        assert_eq!(
            bound("self.hpRatio < 0.5 && distance(closest.enemy()) <= 6"),
            Some(6.0)
        );
        assert_eq!(
            bound("distance(closest.enemy()) <= 6 && distance(weakest.enemy()) < 2"),
            Some(2.0)
        );
    }

    #[test]
    fn disjunction_needs_both_sides() {
        assert_eq!(
            bound("distance(closest.enemy()) <= 6 || distance(weakest.enemy()) < 9"),
            Some(9.0)
        );
        assert_eq!(bound("distance(closest.enemy()) <= 6 || tick > 3"), None);
    }

    #[test]
    fn unrelated_shapes_have_no_bound() {
        assert_eq!(bound("distance(closest.ally()) <= 3"), None);
        assert_eq!(bound("distance(closest.enemy()) > 3"), None);
        assert_eq!(bound("!(distance(closest.enemy()) > 3)"), None);
        assert_eq!(bound("true"), None);
    }
}
