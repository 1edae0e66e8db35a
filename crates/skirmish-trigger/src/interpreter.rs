//! Tree-walking interpreter.
//!
//! Covers the whole language and is the reference the compiled forms are
//! checked against. It has no access to anything beyond the [`Scope`] it is
//! handed.

use tracing::trace;

use crate::ast::{BinOp, Expr};
use crate::env::{self, Halt, Scope};
use crate::parser::parse;
use crate::value::{self, Value};

/// Evaluate `expr`, propagating errors and short-circuits.
pub fn eval(expr: &Expr, scope: &Scope<'_>) -> Result<Value, Halt> {
    match expr {
        Expr::Literal(lit) => Ok(Value::from(lit)),
        Expr::Ident(name) => Ok(env::resolve_ident(scope, name)?),
        Expr::Member {
            object,
            property,
            optional,
        } => {
            let object = eval(object, scope)?;
            env::property(scope, &object, property, *optional)
        }
        Expr::Call { callee, args } => {
            let callee = eval(callee, scope)?;
            let args = args
                .iter()
                .map(|a| eval(a, scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(env::call(scope, &callee, &args)?)
        }
        Expr::OptionalChain(inner) => match eval(inner, scope) {
            Err(Halt::ShortCircuit) => Ok(Value::Undefined),
            other => other,
        },
        Expr::Unary { op, operand } => Ok(value::unary(*op, &eval(operand, scope)?)),
        Expr::Binary { op, left, right } => {
            let l = eval(left, scope)?;
            match op {
                BinOp::And if !l.truthy() => Ok(l),
                BinOp::Or if l.truthy() => Ok(l),
                BinOp::And | BinOp::Or => eval(right, scope),
                _ => {
                    let r = eval(right, scope)?;
                    Ok(value::binary(*op, &l, &r))
                }
            }
        }
    }
}

/// Evaluate `expr`; a runtime error makes the result `null`.
pub fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Value {
    settle(eval(expr, scope))
}

/// Parse and evaluate `src` on every call, with no caching.
///
/// Text that does not parse evaluates to `null`.
pub fn evaluate_source(src: &str, scope: &Scope<'_>) -> Value {
    match parse(src) {
        Ok(expr) => evaluate(&expr, scope),
        Err(e) => {
            trace!(expression = %src, error = %e, "unparseable expression evaluates to null");
            Value::Null
        }
    }
}

/// Collapse a raw evaluation result into a value.
pub(crate) fn settle(result: Result<Value, Halt>) -> Value {
    match result {
        Ok(v) => v,
        Err(Halt::ShortCircuit) => Value::Undefined,
        Err(Halt::Error(e)) => {
            trace!(error = %e, "expression error evaluates to null");
            Value::Null
        }
    }
}
