//! Lowering expression trees into reusable evaluators.
//!
//! [`CompiledExpr::compile`] picks the cheapest strategy that covers the
//! expression:
//!
//! 1. a [`FastPath`] shape (constants, enemy-within-range, closest enemy);
//! 2. a tree of boxed closures, when every node is in the compiled grammar
//!    (literals, `self`/`target`/`tick`, member access, `distance(..)`,
//!    noun-group calls, unary and binary operators);
//! 3. otherwise the tree interpreter over the parsed AST.
//!
//! Text that fails to parse compiles to an evaluator that always yields
//! `null`. All strategies share the operator and property semantics in
//! [`value`](crate::value) and [`env`](crate::env), and agree with
//! [`interpreter::evaluate_source`](crate::interpreter::evaluate_source)
//! on every input.

use std::fmt;

use tracing::{debug, warn};

use crate::analysis::enemy_range_bound;
use crate::ast::{BinOp, Expr, Noun, Side};
use crate::env::{self, Halt, Scope};
use crate::fast_path::FastPath;
use crate::interpreter;
use crate::parser::parse;
use crate::value::{self, Value};
use crate::ParseError;

type Thunk = Box<dyn Fn(&Scope<'_>) -> Result<Value, Halt> + Send + Sync>;

/// Which strategy an expression compiled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Constant,
    FastPath,
    Compiled,
    Interpreted,
    Invalid,
}

enum Body {
    Fast(FastPath),
    Closure(Thunk),
    Interpreted,
    Invalid(ParseError),
}

/// An immutable evaluator bound to one expression text.
pub struct CompiledExpr {
    source: String,
    ast: Option<Expr>,
    body: Body,
    range_bound: Option<f64>,
}

impl CompiledExpr {
    /// Parse and lower `source`.
    pub fn compile(source: &str) -> Self {
        let ast = match parse(source) {
            Ok(ast) => ast,
            Err(e) => {
                warn!(expression = %source, error = %e, "trigger expression does not parse; it will evaluate to null");
                return Self {
                    source: source.to_owned(),
                    ast: None,
                    body: Body::Invalid(e),
                    range_bound: None,
                };
            }
        };

        let range_bound = enemy_range_bound(&ast);
        let body = if let Some(fast) = FastPath::recognise(&ast) {
            Body::Fast(fast)
        } else {
            match lower(&ast) {
                Ok(thunk) => Body::Closure(thunk),
                Err(Unsupported) => {
                    debug!(expression = %source, "expression outside compiled grammar; using interpreter");
                    Body::Interpreted
                }
            }
        };

        Self {
            source: source.to_owned(),
            ast: Some(ast),
            body,
            range_bound,
        }
    }

    /// Evaluate against `scope`. Runtime errors yield `null`.
    pub fn evaluate(&self, scope: &Scope<'_>) -> Value {
        match &self.body {
            Body::Fast(fast) => fast.evaluate(scope),
            Body::Closure(thunk) => interpreter::settle(thunk(scope)),
            Body::Interpreted => match &self.ast {
                Some(ast) => interpreter::evaluate(ast, scope),
                None => Value::Null,
            },
            Body::Invalid(_) => Value::Null,
        }
    }

    /// Evaluate and coerce to a boolean.
    pub fn test(&self, scope: &Scope<'_>) -> bool {
        self.evaluate(scope).truthy()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> Option<&Expr> {
        self.ast.as_ref()
    }

    pub fn strategy(&self) -> Strategy {
        match &self.body {
            Body::Fast(FastPath::Constant(_)) => Strategy::Constant,
            Body::Fast(_) => Strategy::FastPath,
            Body::Closure(_) => Strategy::Compiled,
            Body::Interpreted => Strategy::Interpreted,
            Body::Invalid(_) => Strategy::Invalid,
        }
    }

    /// The parse error, for expressions that did not parse.
    pub fn parse_error(&self) -> Option<&ParseError> {
        match &self.body {
            Body::Invalid(e) => Some(e),
            _ => None,
        }
    }

    /// See [`enemy_range_bound`].
    pub fn enemy_range_bound(&self) -> Option<f64> {
        self.range_bound
    }
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpr")
            .field("source", &self.source)
            .field("strategy", &self.strategy())
            .field("range_bound", &self.range_bound)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Lowering
// ---------------------------------------------------------------------------

/// The node is outside the compiled grammar.
struct Unsupported;

fn thunk<F>(f: F) -> Thunk
where
    F: Fn(&Scope<'_>) -> Result<Value, Halt> + Send + Sync + 'static,
{
    Box::new(f)
}

fn lower(expr: &Expr) -> Result<Thunk, Unsupported> {
    Ok(match expr {
        Expr::Literal(lit) => {
            let v = Value::from(lit);
            thunk(move |_| Ok(v.clone()))
        }
        Expr::Ident(name) => match name.as_str() {
            "self" => thunk(|s| Ok(Value::Unit(s.subject))),
            "target" => thunk(|s| Ok(s.target.map_or(Value::Null, Value::Unit))),
            "tick" => thunk(|s| Ok(Value::Number(s.env.tick() as f64))),
            _ => return Err(Unsupported),
        },
        Expr::Member {
            object,
            property,
            optional,
        } => {
            let object = lower(object)?;
            let property = property.clone();
            let optional = *optional;
            thunk(move |s| {
                let v = object(s)?;
                env::property(s, &v, &property, optional)
            })
        }
        Expr::Call { callee, args } => lower_call(callee, args)?,
        Expr::OptionalChain(inner) => {
            let inner = lower(inner)?;
            thunk(move |s| match inner(s) {
                Err(Halt::ShortCircuit) => Ok(Value::Undefined),
                other => other,
            })
        }
        Expr::Unary { op, operand } => {
            let operand = lower(operand)?;
            let op = *op;
            thunk(move |s| Ok(value::unary(op, &operand(s)?)))
        }
        Expr::Binary { op, left, right } => {
            let l = lower(left)?;
            let r = lower(right)?;
            match *op {
                BinOp::And => thunk(move |s| {
                    let lv = l(s)?;
                    if lv.truthy() {
                        r(s)
                    } else {
                        Ok(lv)
                    }
                }),
                BinOp::Or => thunk(move |s| {
                    let lv = l(s)?;
                    if lv.truthy() {
                        Ok(lv)
                    } else {
                        r(s)
                    }
                }),
                op => thunk(move |s| {
                    let lv = l(s)?;
                    let rv = r(s)?;
                    Ok(value::binary(op, &lv, &rv))
                }),
            }
        }
    })
}

fn lower_call(callee: &Expr, args: &[Expr]) -> Result<Thunk, Unsupported> {
    match callee {
        Expr::Ident(name) if name == "distance" && args.len() == 1 => {
            let arg = lower(&args[0])?;
            Ok(thunk(move |s| {
                let v = arg(s)?;
                Ok(Value::Number(env::distance(s, &v)))
            }))
        }
        Expr::Member {
            object, property, ..
        } if args.is_empty() => {
            let Expr::Ident(name) = &**object else {
                return Err(Unsupported);
            };
            let noun = Noun::from_name(name).ok_or(Unsupported)?;
            let side = Side::from_name(property).ok_or(Unsupported)?;
            Ok(thunk(move |s| Ok(env::select(s, noun, side))))
        }
        _ => Err(Unsupported),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StoreEnv;
    use skirmish_units::prelude::*;

    #[test]
    fn strategies_are_chosen_by_shape() {
        let cases = [
            ("1 < 2", Strategy::Constant),
            ("distance(closest.enemy()) <= 3", Strategy::FastPath),
            ("closest.enemy()", Strategy::FastPath),
            ("self.hp / self.maxHp < 0.5", Strategy::Compiled),
            ("distance(weakest.enemy()?.pos) < 4 && tick > 2", Strategy::Compiled),
            ("min(self.hp, 3) > 1", Strategy::Interpreted),
            ("closest.enemy", Strategy::Interpreted),
            ("self.hp <", Strategy::Invalid),
        ];
        for (src, expected) in cases {
            assert_eq!(CompiledExpr::compile(src).strategy(), expected, "{src}");
        }
    }

    #[test]
    fn invalid_expression_evaluates_to_null() {
        let mut store = UnitStore::new(1, CapacityPolicy::Reject);
        let me = store
            .add_unit(UnitSpec::new("me", Vec2::ZERO, Team::Friendly, 1.0))
            .unwrap();
        let env = StoreEnv::new(&store, 0);
        let compiled = CompiledExpr::compile("((");
        assert!(compiled.parse_error().is_some());
        assert_eq!(compiled.evaluate(&Scope::new(&env, me)), Value::Null);
        assert!(!compiled.test(&Scope::new(&env, me)));
    }

    #[test]
    fn compiled_null_dereference_is_null() {
        let mut store = UnitStore::new(1, CapacityPolicy::Reject);
        let me = store
            .add_unit(UnitSpec::new("me", Vec2::ZERO, Team::Friendly, 1.0))
            .unwrap();
        let env = StoreEnv::new(&store, 0);
        let compiled = CompiledExpr::compile("target.hp > 0");
        assert_eq!(compiled.strategy(), Strategy::Compiled);
        assert_eq!(compiled.evaluate(&Scope::new(&env, me)), Value::Null);
        let compiled = CompiledExpr::compile("target?.hp > 0");
        assert_eq!(compiled.evaluate(&Scope::new(&env, me)), Value::Bool(false));
    }
}
