//! Skirmish trigger -- the expression language used by ability conditions
//! and targets.
//!
//! Expressions are a narrow, closed-world query language over one tick of
//! simulation state:
//!
//! ```text
//! self.hpRatio < 0.5 && distance(closest.enemy()?.pos) <= 6
//! ```
//!
//! Text is parsed once into an [`Expr`](ast::Expr) tree. The
//! [`ExpressionCache`](cache::ExpressionCache) compiles each distinct text to
//! the cheapest evaluator that covers it (see [`compiler`]); the tree
//! interpreter handles everything else and is the reference every other
//! strategy must agree with. Evaluation only reads what a
//! [`TriggerEnv`](env::TriggerEnv) exposes; there is no host access.
//!
//! # Quick Start
//!
//! ```
//! use skirmish_trigger::prelude::*;
//! use skirmish_units::prelude::*;
//!
//! let mut store = UnitStore::new(4, CapacityPolicy::Reject);
//! let me = store.add_unit(UnitSpec::new("me", Vec2::ZERO, Team::Friendly, 10.0)).unwrap();
//! store.add_unit(UnitSpec::new("orc", Vec2::new(3.0, 0.0), Team::Hostile, 10.0)).unwrap();
//!
//! let env = StoreEnv::new(&store, 0);
//! let mut cache = ExpressionCache::new();
//! let trigger = cache.get("distance(closest.enemy()) <= 4");
//! assert!(trigger.test(&Scope::new(&env, me)));
//! ```

#![deny(unsafe_code)]

pub mod analysis;
pub mod ast;
pub mod cache;
pub mod compiler;
pub mod env;
pub mod fast_path;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod value;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Expression text that could not be parsed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at {position}: {message}")]
pub struct ParseError {
    /// Byte offset into the source text.
    pub position: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// Runtime failures. Callers of the public evaluation functions never see
/// these: a failing evaluation yields `null`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("cannot read property '{property}' of null")]
    NullDereference { property: String },

    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String },

    #[error("{function} expects {expected} argument(s), got {got}")]
    BadArity {
        function: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("a {type_name} is not callable")]
    NotCallable { type_name: &'static str },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::analysis::enemy_range_bound;
    pub use crate::ast::{Expr, Noun, Side};
    pub use crate::cache::{CacheStats, ExpressionCache};
    pub use crate::compiler::{CompiledExpr, Strategy};
    pub use crate::env::{Scope, StoreEnv, TriggerEnv};
    pub use crate::interpreter::evaluate_source;
    pub use crate::parser::parse;
    pub use crate::value::Value;
    pub use crate::{EvalError, ParseError};
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use skirmish_units::prelude::*;

    /// Three units: the subject plus two hostiles at distances 3 and 7.
    fn three_units() -> (UnitStore, UnitIndex, UnitIndex) {
        let mut store = UnitStore::new(4, CapacityPolicy::Reject);
        let me = store
            .add_unit(UnitSpec::new("me", Vec2::ZERO, Team::Friendly, 10.0))
            .unwrap();
        store
            .add_unit(UnitSpec::new("far", Vec2::new(0.0, 7.0), Team::Hostile, 10.0))
            .unwrap();
        let near = store
            .add_unit(UnitSpec::new("near", Vec2::new(3.0, 0.0), Team::Hostile, 10.0))
            .unwrap();
        (store, me, near)
    }

    #[test]
    fn closest_enemy_is_the_nearer_hostile() {
        let (store, me, near) = three_units();
        let env = StoreEnv::new(&store, 0);
        let scope = Scope::new(&env, me);
        let mut cache = ExpressionCache::new();
        assert_eq!(cache.get("closest.enemy()").evaluate(&scope), Value::Unit(near));
        assert_eq!(evaluate_source("closest.enemy()", &scope), Value::Unit(near));
        assert_eq!(
            cache.get("distance(closest.enemy())").evaluate(&scope),
            Value::Number(3.0)
        );
    }

    #[test]
    fn closest_enemy_is_null_without_hostiles() {
        let mut store = UnitStore::new(4, CapacityPolicy::Reject);
        let me = store
            .add_unit(UnitSpec::new("me", Vec2::ZERO, Team::Friendly, 10.0))
            .unwrap();
        store
            .add_unit(UnitSpec::new("pal", Vec2::new(1.0, 0.0), Team::Friendly, 10.0))
            .unwrap();
        store
            .add_unit(UnitSpec::new("cow", Vec2::new(2.0, 0.0), Team::Neutral, 10.0))
            .unwrap();
        let env = StoreEnv::new(&store, 0);
        let scope = Scope::new(&env, me);
        let mut cache = ExpressionCache::new();
        assert_eq!(cache.get("closest.enemy()").evaluate(&scope), Value::Null);
        assert_eq!(
            cache.get("distance(closest.enemy())").evaluate(&scope),
            Value::Number(f64::INFINITY)
        );
        assert_eq!(cache.get("distance(null)").evaluate(&scope), Value::Number(f64::INFINITY));
    }

    #[test]
    fn cached_and_fresh_compilations_agree() {
        let (store, me, near) = three_units();
        let env = StoreEnv::new(&store, 4);
        let scope = Scope::new(&env, me).with_target(Some(near));
        let mut cache = ExpressionCache::new();
        for src in [
            "self.hp > 5 && tick >= 4",
            "distance(target.pos) < 3",
            "max(target.hp, 2)",
            "weakest.enemy()?.id",
        ] {
            let first = cache.get(src).evaluate(&scope);
            let again = cache.get(src).evaluate(&scope);
            let fresh = CompiledExpr::compile(src).evaluate(&scope);
            assert!(first.same_as(&again), "{src}");
            assert!(first.same_as(&fresh), "{src}");
        }
    }
}
