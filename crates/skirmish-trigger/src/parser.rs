//! Recursive-descent parser.
//!
//! Precedence, loosest first: `||`, `&&`, equality, comparison, additive,
//! multiplicative, unary, postfix (member access and calls).

use crate::ast::{BinOp, Expr, Literal, UnaryOp};
use crate::lexer::{tokenize, Spanned, Token};
use crate::ParseError;

/// Bracket and argument nesting allowed before parsing gives up.
const MAX_NESTING: usize = 64;
/// Operator, member and call nodes allowed in one expression.
const MAX_NODES: usize = 1024;

/// Parse trigger expression text into an [`Expr`].
pub fn parse(src: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        end: src.len(),
        nesting: 0,
        nodes: 0,
    };
    let expr = parser.expression()?;
    if let Some(tok) = parser.peek_spanned() {
        return Err(ParseError::new(
            tok.pos,
            format!("unexpected {:?} after expression", tok.token),
        ));
    }
    Ok(expr)
}

struct Parser<'t> {
    tokens: &'t [Spanned],
    pos: usize,
    end: usize,
    nesting: usize,
    nodes: usize,
}

impl<'t> Parser<'t> {
    fn peek_spanned(&self) -> Option<&'t Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&'t Token> {
        self.peek_spanned().map(|s| &s.token)
    }

    fn here(&self) -> usize {
        self.peek_spanned().map_or(self.end, |s| s.pos)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(ParseError::new(self.here(), format!("expected {what}")))
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        if self.nesting >= MAX_NESTING {
            return Err(ParseError::new(self.here(), "expression is nested too deeply"));
        }
        self.nesting += 1;
        let expr = self.or();
        self.nesting -= 1;
        expr
    }

    /// Count one more interior node, so that evaluating or dropping the tree
    /// cannot recurse without bound.
    fn node(&mut self) -> Result<(), ParseError> {
        self.nodes += 1;
        if self.nodes > MAX_NODES {
            return Err(ParseError::new(self.here(), "expression is too large"));
        }
        Ok(())
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and()?;
        while self.eat(&Token::OrOr) {
            let right = self.and()?;
            self.node()?;
            left = Expr::binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality()?;
        while self.eat(&Token::AndAnd) {
            let right = self.equality()?;
            self.node()?;
            left = Expr::binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::Ne,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.comparison()?;
            self.node()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Le) => BinOp::Le,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Ge) => BinOp::Ge,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.additive()?;
            self.node()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            self.node()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            self.node()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            _ => return self.postfix(),
        };
        self.node()?;
        self.pos += 1;
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        let mut optional_chain = false;
        loop {
            match self.peek() {
                Some(Token::Dot) | Some(Token::QuestionDot) => {
                    let optional = self.peek() == Some(&Token::QuestionDot);
                    self.pos += 1;
                    let property = self.property_name()?;
                    self.node()?;
                    optional_chain |= optional;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional,
                    };
                }
                Some(Token::LParen) => {
                    self.pos += 1;
                    let args = self.arguments()?;
                    self.node()?;
                    expr = Expr::call(expr, args);
                }
                _ => break,
            }
        }
        Ok(if optional_chain {
            Expr::OptionalChain(Box::new(expr))
        } else {
            expr
        })
    }

    fn property_name(&mut self) -> Result<String, ParseError> {
        let at = self.here();
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name.clone()),
            _ => Err(ParseError::new(at, "expected property name")),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            self.expect(&Token::Comma, "',' or ')'")?;
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let at = self.here();
        let Some(token) = self.advance() else {
            return Err(ParseError::new(at, "unexpected end of expression"));
        };
        Ok(match token {
            Token::Number(n) => Expr::Literal(Literal::Number(*n)),
            Token::Str(s) => Expr::Literal(Literal::Str(s.clone())),
            Token::True => Expr::Literal(Literal::Bool(true)),
            Token::False => Expr::Literal(Literal::Bool(false)),
            Token::Null => Expr::Literal(Literal::Null),
            Token::Undefined => Expr::Literal(Literal::Undefined),
            Token::Ident(name) => Expr::Ident(name.clone()),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(&Token::RParen, "')'")?;
                inner
            }
            other => {
                return Err(ParseError::new(at, format!("unexpected {other:?}")));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_of_logical_and_comparison() {
        let expr = parse("self.hp < 5 || tick > 3 && target != null").unwrap();
        let Expr::Binary { op: BinOp::Or, right, .. } = expr else {
            panic!("expected || at the root");
        };
        assert!(matches!(*right, Expr::Binary { op: BinOp::And, .. }));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::binary(
                BinOp::Add,
                Expr::number(1.0),
                Expr::binary(BinOp::Mul, Expr::number(2.0), Expr::number(3.0)),
            )
        );
    }

    #[test]
    fn noun_selector_call() {
        assert_eq!(
            parse("closest.enemy()").unwrap(),
            Expr::call(Expr::member(Expr::ident("closest"), "enemy"), vec![])
        );
    }

    #[test]
    fn optional_chain_wraps_whole_postfix_chain() {
        let expr = parse("distance(closest.enemy()?.pos)").unwrap();
        let Expr::Call { args, .. } = expr else {
            panic!("expected call");
        };
        let Expr::OptionalChain(inner) = &args[0] else {
            panic!("expected optional chain, got {:?}", args[0]);
        };
        assert!(matches!(**inner, Expr::Member { optional: true, .. }));
    }

    #[test]
    fn parenthesised_chain_limits_short_circuit() {
        let expr = parse("(target?.pos).x").unwrap();
        let Expr::Member { object, optional: false, .. } = expr else {
            panic!("expected plain member");
        };
        assert!(matches!(*object, Expr::OptionalChain(_)));
    }

    #[test]
    fn display_round_trips() {
        for src in [
            "((self.hp / self.maxHp) < 0.5)",
            "distance(closest.enemy()?.pos)",
            "!((tick == 3))",
            "min(1, 2, \"a\\\"b\")",
        ] {
            let expr = parse(src).unwrap();
            assert_eq!(parse(&expr.to_string()).unwrap(), expr, "{src}");
        }
    }

    #[test]
    fn errors_carry_positions() {
        assert_eq!(parse("self.").unwrap_err().position, 5);
        assert_eq!(parse("(1 + 2").unwrap_err().position, 6);
        assert_eq!(parse("1 2").unwrap_err().position, 2);
        assert_eq!(parse("").unwrap_err().position, 0);
        assert!(parse("f(1,)").is_err());
    }

    #[test]
    fn runaway_nesting_is_a_parse_error() {
        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(parse(&parens).unwrap_err().message.contains("nested"));
        let bangs = format!("{}true", "!".repeat(100_000));
        assert!(parse(&bangs).unwrap_err().message.contains("too large"));
        let sum = vec!["1"; 100_000].join(" + ");
        assert!(parse(&sum).is_err());
        let chain = format!("self{}", ".x".repeat(100_000));
        assert!(parse(&chain).is_err());

        let fine = format!("{}1{}", "(".repeat(32), ")".repeat(32));
        assert_eq!(parse(&fine).unwrap(), Expr::number(1.0));
    }
}
