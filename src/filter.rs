//! Filter expressions for record queries.
//!
//! The record stores accept the same filter strings the table service does
//! for simple queries:
//!
//! ```text
//! PartitionKey eq 'SUV'
//! price lt 20000
//! PartitionKey eq 'Sedan' and price lt 18000
//! make eq 'Toyota' or make eq 'Honda'
//! price ge 15000 and price le 30000
//! ```
//!
//! ## Grammar
//!
//! ```text
//! filter  := clause (joiner clause)*
//! clause  := field op value
//! joiner  := "and" | "or"
//! op      := "eq" | "ne" | "lt" | "le" | "gt" | "ge"
//! value   := 'string' | integer | float | true | false
//! ```
//!
//! Clauses are combined strictly left to right: `a or b and c` means
//! `(a or b) and c`. There are no parentheses. Keywords are case-insensitive;
//! field names are not. Inside a string, `''` is an escaped quote.
//!
//! ## Comparison
//!
//! Integers and floats compare numerically with each other. Strings compare
//! lexicographically. Any other pairing, or a field the record lacks, never
//! matches (not even for `ne`).

use crate::types::{ItemRecord, Value};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("empty filter expression")]
    Empty,
    #[error("unterminated string starting at {0}")]
    UnterminatedString(usize),
    #[error("unexpected character {ch:?} at {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("invalid number {text:?} at {pos}")]
    InvalidNumber { text: String, pos: usize },
    #[error("unknown operator {op:?} at {pos}")]
    UnknownOperator { op: String, pos: usize },
    #[error("expected {expected} at {pos}, found {found}")]
    Expected {
        expected: &'static str,
        found: String,
        pos: usize,
    },
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            _ => None,
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joiner {
    And,
    Or,
}

/// A single `field op value` comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub field: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Clause {
    pub fn matches(&self, record: &ItemRecord) -> bool {
        record
            .field(&self.field)
            .and_then(|actual| compare(&actual, &self.value))
            .is_some_and(|ordering| self.op.accepts(ordering))
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    first: Clause,
    rest: Vec<(Joiner, Clause)>,
}

impl Filter {
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        let tokens = tokenize(input)?;
        Parser { tokens, pos: 0 }.parse_filter(input.len())
    }

    pub fn matches(&self, record: &ItemRecord) -> bool {
        self.rest
            .iter()
            .fold(self.first.matches(record), |acc, (joiner, clause)| {
                match joiner {
                    Joiner::And => acc && clause.matches(record),
                    Joiner::Or => acc || clause.matches(record),
                }
            })
    }

    /// All clauses in source order.
    pub fn clauses(&self) -> impl Iterator<Item = &Clause> {
        std::iter::once(&self.first).chain(self.rest.iter().map(|(_, c)| c))
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Float(b)) => compare_int_float(*a, *b),
        (Value::Float(a), Value::Int(b)) => compare_int_float(*b, *a).map(Ordering::reverse),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Exact comparison without rounding `a` to the nearest `f64`.
fn compare_int_float(a: i64, b: f64) -> Option<Ordering> {
    // 2^63: every i64 is below it and at or above its negation.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if b.is_nan() {
        return None;
    }
    if b >= LIMIT {
        return Some(Ordering::Less);
    }
    if b < -LIMIT {
        return Some(Ordering::Greater);
    }
    let whole = b.trunc();
    match a.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(b - whole)),
        ordering => Some(ordering),
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Word(String),
    Str(String),
    Number(Value),
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>, FilterError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch == '\'' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some((_, '\'')) => {
                        if matches!(chars.peek(), Some((_, '\''))) {
                            chars.next();
                            text.push('\'');
                        } else {
                            break;
                        }
                    }
                    Some((_, c)) => text.push(c),
                    None => return Err(FilterError::UnterminatedString(pos)),
                }
            }
            tokens.push(Token {
                kind: TokenKind::Str(text),
                pos,
            });
        } else if ch.is_ascii_digit() || ch == '-' {
            let mut text = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_ascii_digit() || c == '.' || (c == '-' && text.is_empty()) {
                    text.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Number(parse_number(&text, pos)?),
                pos,
            });
        } else if ch.is_alphabetic() || ch == '_' {
            let mut text = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    text.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Word(text),
                pos,
            });
        } else {
            return Err(FilterError::UnexpectedChar { ch, pos });
        }
    }

    Ok(tokens)
}

fn parse_number(text: &str, pos: usize) -> Result<Value, FilterError> {
    let invalid = || FilterError::InvalidNumber {
        text: text.to_string(),
        pos,
    };
    if text.contains('.') {
        text.parse::<f64>().map(Value::Float).map_err(|_| invalid())
    } else {
        text.parse::<i64>().map(Value::Int).map_err(|_| invalid())
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn parse_filter(mut self, end: usize) -> Result<Filter, FilterError> {
        if self.tokens.is_empty() {
            return Err(FilterError::Empty);
        }
        let first = self.parse_clause(end)?;
        let mut rest = Vec::new();
        while let Some(token) = self.next() {
            let joiner = match &token.kind {
                TokenKind::Word(w) if w.eq_ignore_ascii_case("and") => Joiner::And,
                TokenKind::Word(w) if w.eq_ignore_ascii_case("or") => Joiner::Or,
                other => {
                    return Err(FilterError::Expected {
                        expected: "'and' or 'or'",
                        found: describe(other),
                        pos: token.pos,
                    });
                }
            };
            rest.push((joiner, self.parse_clause(end)?));
        }
        Ok(Filter { first, rest })
    }

    fn parse_clause(&mut self, end: usize) -> Result<Clause, FilterError> {
        let field = match self.next() {
            Some(Token {
                kind: TokenKind::Word(w),
                ..
            }) => w,
            Some(token) => {
                return Err(FilterError::Expected {
                    expected: "field name",
                    found: describe(&token.kind),
                    pos: token.pos,
                });
            }
            None => return Err(end_of_input("field name", end)),
        };

        let op = match self.next() {
            Some(Token {
                kind: TokenKind::Word(w),
                pos,
            }) => CompareOp::from_keyword(&w).ok_or(FilterError::UnknownOperator { op: w, pos })?,
            Some(token) => {
                return Err(FilterError::Expected {
                    expected: "operator",
                    found: describe(&token.kind),
                    pos: token.pos,
                });
            }
            None => return Err(end_of_input("operator", end)),
        };

        let value = match self.next() {
            Some(Token {
                kind: TokenKind::Str(s),
                ..
            }) => Value::Str(s),
            Some(Token {
                kind: TokenKind::Number(n),
                ..
            }) => n,
            Some(Token {
                kind: TokenKind::Word(w),
                ..
            }) if w.eq_ignore_ascii_case("true") => Value::Bool(true),
            Some(Token {
                kind: TokenKind::Word(w),
                ..
            }) if w.eq_ignore_ascii_case("false") => Value::Bool(false),
            Some(token) => {
                return Err(FilterError::Expected {
                    expected: "value",
                    found: describe(&token.kind),
                    pos: token.pos,
                });
            }
            None => return Err(end_of_input("value", end)),
        };

        Ok(Clause { field, op, value })
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Word(w) => format!("{:?}", w),
        TokenKind::Str(s) => format!("'{}'", s),
        TokenKind::Number(n) => n.to_string(),
    }
}

fn end_of_input(expected: &'static str, pos: usize) -> FilterError {
    FilterError::Expected {
        expected,
        found: "end of input".to_string(),
        pos,
    }
}
