//! Runtime values and operator semantics.
//!
//! Every evaluation strategy (interpreter, compiled closures, fast paths)
//! goes through the functions in this module, so operators behave the same
//! regardless of how an expression was compiled.
//!
//! - `==`/`!=` are strict: different variants are never equal, `null` and
//!   `undefined` are distinct, `NaN` is unequal to itself.
//! - `< <= > >=` compare two numbers numerically or two strings
//!   lexicographically; any other pairing is `false`.
//! - `+` concatenates when either side is a string; otherwise arithmetic
//!   needs two numbers and yields `NaN` for anything else. Booleans and
//!   `null` are never coerced to numbers, so `true + 1` is `NaN`, not `2`.
//!   Unary `-` follows the same rule.
//! - `&&`/`||` return one of their operands, not a coerced boolean.

use std::fmt;

use skirmish_units::geometry::Vec2;
use skirmish_units::meta::MetaValue;
use skirmish_units::slot::UnitIndex;

use crate::ast::{BinOp, Builtin, Literal, Noun, Side, UnaryOp};

/// A value produced by evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    /// A live unit in the store.
    Unit(UnitIndex),
    Point(Vec2),
    /// A noun group before `.ally`/`.enemy` is chosen.
    Noun(Noun),
    /// A noun group bound to a side, callable with no arguments.
    Selector(Noun, Side),
    Function(Builtin),
}

impl Value {
    /// JavaScript-style truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !(*n == 0.0 || n.is_nan()),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// `null` or `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Strict equality as used by `==`.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self == other,
        }
    }

    /// Structural identity, treating `NaN` as equal to itself. Used to check
    /// that two evaluation strategies produced the same result.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits() || a == b,
            _ => self == other,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Unit(_) => "unit",
            Value::Point(_) => "point",
            Value::Noun(_) => "noun",
            Value::Selector(..) => "selector",
            Value::Function(_) => "function",
        }
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::Number(n) => Value::Number(*n),
            Literal::Str(s) => Value::Str(s.clone()),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Null => Value::Null,
            Literal::Undefined => Value::Undefined,
        }
    }
}

impl From<&MetaValue> for Value {
    fn from(v: &MetaValue) -> Self {
        match v {
            MetaValue::Bool(b) => Value::Bool(*b),
            MetaValue::Number(n) => Value::Number(*n),
            MetaValue::Text(s) => Value::Str(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Unit(i) => write!(f, "[unit {i}]"),
            Value::Point(p) => write!(f, "({}, {})", p.x, p.y),
            Value::Noun(n) => write!(f, "[noun {n:?}]"),
            Value::Selector(n, s) => write!(f, "[selector {n:?}.{s:?}]"),
            Value::Function(b) => write!(f, "[function {}]", b.name()),
        }
    }
}

/// Apply a unary operator.
pub fn unary(op: UnaryOp, v: &Value) -> Value {
    match op {
        UnaryOp::Not => Value::Bool(!v.truthy()),
        UnaryOp::Neg => Value::Number(v.as_number().map_or(f64::NAN, |n| -n)),
    }
}

/// Apply a non-logical binary operator to two evaluated operands.
///
/// `And`/`Or` are handled by the callers because they short-circuit; passed
/// here they fall back to the eager operand-returning form.
pub fn binary(op: BinOp, l: &Value, r: &Value) -> Value {
    match op {
        BinOp::Add => match (l, r) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::Str(_), _) | (_, Value::Str(_)) => Value::Str(format!("{l}{r}")),
            _ => Value::Number(f64::NAN),
        },
        BinOp::Sub => arith(l, r, |a, b| a - b),
        BinOp::Mul => arith(l, r, |a, b| a * b),
        BinOp::Div => arith(l, r, |a, b| a / b),
        BinOp::Lt => Value::Bool(compare(l, r).is_some_and(|o| o.is_lt())),
        BinOp::Le => Value::Bool(compare(l, r).is_some_and(|o| o.is_le())),
        BinOp::Gt => Value::Bool(compare(l, r).is_some_and(|o| o.is_gt())),
        BinOp::Ge => Value::Bool(compare(l, r).is_some_and(|o| o.is_ge())),
        BinOp::Eq => Value::Bool(l.strict_eq(r)),
        BinOp::Ne => Value::Bool(!l.strict_eq(r)),
        BinOp::And => {
            if l.truthy() {
                r.clone()
            } else {
                l.clone()
            }
        }
        BinOp::Or => {
            if l.truthy() {
                l.clone()
            } else {
                r.clone()
            }
        }
    }
}

fn arith(l: &Value, r: &Value, f: impl Fn(f64, f64) -> f64) -> Value {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Value::Number(f(*a, *b)),
        _ => Value::Number(f64::NAN),
    }
}

fn compare(l: &Value, r: &Value) -> Option<std::cmp::Ordering> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
