//! Expression tree.
//!
//! Parsing happens once per distinct expression text. Both the interpreter
//! and the closure compiler walk this tree.

use std::fmt;

/// Binary operators, including the short-circuiting logical ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
}

/// Expression AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// A bare name: `self`, `target`, `tick`, a noun group or a function.
    Ident(String),
    /// `object.property`, or `object?.property` when `optional`.
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    /// `callee(args...)`.
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// Boundary of a member chain containing `?.`. A nullish receiver
    /// anywhere inside short-circuits the whole chain to `undefined`.
    OptionalChain(Box<Expr>),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn number(n: f64) -> Self {
        Expr::Literal(Literal::Number(n))
    }

    pub fn ident(name: &str) -> Self {
        Expr::Ident(name.to_owned())
    }

    pub fn member(object: Expr, property: &str) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: property.to_owned(),
            optional: false,
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Prints fully parenthesised source that parses back to an equivalent tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Literal::Number(n)) => write!(f, "{n}"),
            Expr::Literal(Literal::Str(s)) => {
                write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Expr::Literal(Literal::Bool(b)) => write!(f, "{b}"),
            Expr::Literal(Literal::Null) => f.write_str("null"),
            Expr::Literal(Literal::Undefined) => f.write_str("undefined"),
            Expr::Ident(name) => f.write_str(name),
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let dot = if *optional { "?." } else { "." };
                write!(f, "{object}{dot}{property}")
            }
            Expr::Call { callee, args } => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::OptionalChain(inner) => write!(f, "{inner}"),
            Expr::Unary { op, operand } => {
                let sym = match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                };
                write!(f, "{sym}({operand})")
            }
            Expr::Binary { op, left, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Noun groups
// ---------------------------------------------------------------------------

/// The closed set of extremal unit selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Noun {
    /// Minimum distance from the subject.
    Closest,
    /// Maximum distance from the subject.
    Furthest,
    /// Minimum hp.
    Weakest,
    /// Maximum hp.
    Strongest,
    /// Maximum hp / max hp.
    Healthiest,
    /// Maximum missing hp (max hp - hp).
    MostInjured,
}

impl Noun {
    /// Resolve a noun name, including the `nearest`/`farthest` aliases.
    pub fn from_name(name: &str) -> Option<Noun> {
        Some(match name {
            "closest" | "nearest" => Noun::Closest,
            "furthest" | "farthest" => Noun::Furthest,
            "weakest" => Noun::Weakest,
            "strongest" => Noun::Strongest,
            "healthiest" => Noun::Healthiest,
            "mostInjured" => Noun::MostInjured,
            _ => return None,
        })
    }
}

/// Which team relation a noun group searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Same team, excluding the subject.
    Ally,
    /// Any hostile team.
    Enemy,
}

impl Side {
    pub fn from_name(name: &str) -> Option<Side> {
        match name {
            "ally" => Some(Side::Ally),
            "enemy" => Some(Side::Enemy),
            _ => None,
        }
    }
}

/// Functions callable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Distance,
    Min,
    Max,
    Abs,
    Floor,
    Ceil,
    Sqrt,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        Some(match name {
            "distance" => Builtin::Distance,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "abs" => Builtin::Abs,
            "floor" => Builtin::Floor,
            "ceil" => Builtin::Ceil,
            "sqrt" => Builtin::Sqrt,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Distance => "distance",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Abs => "abs",
            Builtin::Floor => "floor",
            Builtin::Ceil => "ceil",
            Builtin::Sqrt => "sqrt",
        }
    }
}
