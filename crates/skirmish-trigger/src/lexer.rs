//! Tokenizer for trigger expressions.

use crate::ParseError;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Undefined,
    LParen,
    RParen,
    Comma,
    Dot,
    QuestionDot,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

/// Split `src` into tokens.
///
/// `===` and `!==` are accepted as spellings of `==` and `!=`; both are
/// strict comparisons.
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, ParseError> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            i = scan_number(bytes, i);
            let text = &src[start..i];
            let value = text
                .parse::<f64>()
                .map_err(|_| ParseError::new(start, format!("malformed number '{text}'")))?;
            out.push(Spanned {
                token: Token::Number(value),
                pos: start,
            });
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' || c == b'$' {
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'$')
            {
                i += 1;
            }
            let token = match &src[start..i] {
                "true" => Token::True,
                "false" => Token::False,
                "null" => Token::Null,
                "undefined" => Token::Undefined,
                word => Token::Ident(word.to_owned()),
            };
            out.push(Spanned { token, pos: start });
            continue;
        }

        if c == b'"' || c == b'\'' {
            let (text, next) = scan_string(src, i)?;
            out.push(Spanned {
                token: Token::Str(text),
                pos: start,
            });
            i = next;
            continue;
        }

        let rest = &src[i..];
        let (token, len) = if rest.starts_with("===") {
            (Token::EqEq, 3)
        } else if rest.starts_with("!==") {
            (Token::NotEq, 3)
        } else if rest.starts_with("==") {
            (Token::EqEq, 2)
        } else if rest.starts_with("!=") {
            (Token::NotEq, 2)
        } else if rest.starts_with("<=") {
            (Token::Le, 2)
        } else if rest.starts_with(">=") {
            (Token::Ge, 2)
        } else if rest.starts_with("&&") {
            (Token::AndAnd, 2)
        } else if rest.starts_with("||") {
            (Token::OrOr, 2)
        } else if rest.starts_with("?.") {
            (Token::QuestionDot, 2)
        } else {
            let token = match c {
                b'(' => Token::LParen,
                b')' => Token::RParen,
                b',' => Token::Comma,
                b'.' => Token::Dot,
                b'!' => Token::Bang,
                b'+' => Token::Plus,
                b'-' => Token::Minus,
                b'*' => Token::Star,
                b'/' => Token::Slash,
                b'<' => Token::Lt,
                b'>' => Token::Gt,
                _ => {
                    let ch = rest.chars().next().unwrap_or('?');
                    return Err(ParseError::new(start, format!("unexpected character '{ch}'")));
                }
            };
            (token, 1)
        };
        out.push(Spanned { token, pos: start });
        i += len;
    }

    Ok(out)
}

fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            i = j;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }
    i
}

fn scan_string(src: &str, start: usize) -> Result<(String, usize), ParseError> {
    let mut chars = src[start..].char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err(ParseError::new(start, "expected string"));
    };
    let mut text = String::new();
    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => {
                let Some((_, esc)) = chars.next() else { break };
                text.push(match esc {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            }
            c if c == quote => return Ok((text, start + offset + c.len_utf8())),
            c => text.push(c),
        }
    }
    Err(ParseError::new(start, "unterminated string literal"))
}
