//! Condition expressions of operations.
//!
//! A condition is parsed once when the operations file is read and evaluated
//! against a namespace of project attributes and mapping values. The
//! language only knows literals, names with attribute access, list literals,
//! comparisons (`==`, `!=`, `in`, `not in`) and boolean operators.

use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::iter::Peekable;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Whitespace,
    Name(String),
    Str(String),
    Int(i64),
    True,
    False,
    None,
    And,
    Or,
    Not,
    In,
    Eq,
    Ne,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Eof,
}

fn name_token(s: String) -> Token {
    match s.as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "in" => Token::In,
        "True" | "true" => Token::True,
        "False" | "false" => Token::False,
        "None" => Token::None,
        _ => Token::Name(s),
    }
}

fn syntax_error(message: impl fmt::Display) -> Error {
    Error::ConfigurationError(format!("invalid condition: {message}"))
}

fn next_string(quote: char, it: impl Iterator<Item = char>) -> Result<(Token, usize)> {
    let mut value = String::new();
    // Opening quote; the closing one is counted in the loop.
    let mut len = 1;
    let mut escaped = false;
    for c in it {
        len += c.len_utf8();
        if escaped {
            value.push(match c {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((Token::Str(value), len));
        } else {
            value.push(c);
        }
    }
    Err(syntax_error("unterminated string literal"))
}

fn next_token(s: &str) -> Result<Option<(Token, usize)>> {
    let mut it = s.chars().peekable();
    let Some(c) = it.next() else {
        return Ok(None);
    };
    let token = match c {
        '(' => (Token::LParen, 1),
        ')' => (Token::RParen, 1),
        '[' => (Token::LBracket, 1),
        ']' => (Token::RBracket, 1),
        ',' => (Token::Comma, 1),
        '.' => (Token::Dot, 1),
        '=' => match it.next() {
            Some('=') => (Token::Eq, 2),
            _ => return Err(syntax_error("expected '=='")),
        },
        '!' => match it.next() {
            Some('=') => (Token::Ne, 2),
            _ => return Err(syntax_error("expected '!='")),
        },
        '"' | '\'' => next_string(c, it)?,
        c if c.is_ascii_whitespace() => {
            let len = 1 + it.take_while(|c| c.is_ascii_whitespace()).count();
            (Token::Whitespace, len)
        }
        c if c.is_ascii_digit() || c == '-' => {
            let mut digits = String::new();
            digits.push(c);
            digits.extend(it.take_while(|c| c.is_ascii_digit()));
            let len = digits.len();
            let value =
                digits.parse::<i64>().map_err(|e| syntax_error(format!("{digits}: {e}")))?;
            (Token::Int(value), len)
        }
        c if c.is_ascii_alphabetic() || c == '_' => {
            let mut name = String::new();
            name.push(c);
            name.extend(it.take_while(|c| c.is_ascii_alphanumeric() || *c == '_'));
            let len = name.len();
            (name_token(name), len)
        }
        other => return Err(syntax_error(format!("unrecognized character '{other}'"))),
    };
    Ok(Some(token))
}

fn tokenize(mut s: &str) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    while let Some((token, n)) = next_token(s)? {
        if token != Token::Whitespace {
            tokens.push(token);
        }
        s = &s[n..];
    }
    tokens.push(Token::Eof);
    Ok(tokens)
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    In,
    NotIn,
}

/// Parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    /// Name followed by zero or more attribute accesses, e.g. `library.name`.
    Name(Vec<String>),
    List(Vec<Expression>),
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Compare { left: Box<Expression>, operator: Comparison, right: Box<Expression> },
}

struct Parser<I: Iterator<Item = Token>> {
    it: Peekable<I>,
}

impl<I: Iterator<Item = Token>> Parser<I> {
    fn new<T: IntoIterator<Item = Token, IntoIter = I>>(v: T) -> Self {
        Self { it: v.into_iter().peekable() }
    }

    fn next(&mut self) -> Result<Token> {
        self.it.next().ok_or_else(|| syntax_error("unexpected end of expression"))
    }

    fn peek(&mut self) -> Option<&Token> {
        self.it.peek()
    }

    fn consume(&mut self, token: Token) -> Result<()> {
        let t = self.next()?;
        if t != token {
            return Err(syntax_error(format!("expected {token:?}, got {t:?}")));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Expression> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.next()?;
            let right = self.parse_and()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.next()?;
            let right = self.parse_not()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression> {
        if self.peek() == Some(&Token::Not) {
            self.next()?;
            return Ok(Expression::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let left = self.parse_operand()?;
        let operator = match self.peek().cloned() {
            Some(Token::Eq) => Comparison::Equal,
            Some(Token::Ne) => Comparison::NotEqual,
            Some(Token::In) => Comparison::In,
            Some(Token::Not) => {
                self.next()?;
                match self.peek().cloned() {
                    Some(Token::In) => Comparison::NotIn,
                    _ => return Err(syntax_error("expected 'in' after 'not'")),
                }
            }
            _ => return Ok(left),
        };
        self.next()?;
        let right = self.parse_operand()?;
        Ok(Expression::Compare { left: Box::new(left), operator, right: Box::new(right) })
    }

    fn parse_operand(&mut self) -> Result<Expression> {
        Ok(match self.next()? {
            Token::Str(s) => Expression::Literal(Value::String(s)),
            Token::Int(i) => Expression::Literal(Value::from(i)),
            Token::True => Expression::Literal(Value::Bool(true)),
            Token::False => Expression::Literal(Value::Bool(false)),
            Token::None => Expression::Literal(Value::Null),
            Token::Name(name) => {
                let mut path = vec![name];
                while self.peek() == Some(&Token::Dot) {
                    self.next()?;
                    match self.next()? {
                        Token::Name(attribute) => path.push(attribute),
                        t => return Err(syntax_error(format!("expected attribute name, got {t:?}"))),
                    }
                }
                Expression::Name(path)
            }
            Token::LParen => {
                let expression = self.parse_or()?;
                self.consume(Token::RParen)?;
                expression
            }
            Token::LBracket => {
                let mut items = vec![];
                if self.peek() != Some(&Token::RBracket) {
                    loop {
                        items.push(self.parse_operand()?);
                        if self.peek() == Some(&Token::RBracket) {
                            break;
                        }
                        self.consume(Token::Comma)?;
                        if self.peek() == Some(&Token::RBracket) {
                            break;
                        }
                    }
                }
                self.consume(Token::RBracket)?;
                Expression::List(items)
            }
            t => return Err(syntax_error(format!("unexpected token {t:?}"))),
        })
    }
}

/// Values a condition may refer to by name.
pub trait ConditionNamespace {
    fn lookup(&self, name: &str) -> Option<Value>;
}

/// Truthiness of a value: null, false, zero and empty values are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

impl Expression {
    fn evaluate(&self, namespace: &dyn ConditionNamespace) -> Result<Value> {
        match self {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Name(path) => resolve_name(path, namespace),
            Expression::List(items) => Ok(Value::Array(
                items.iter().map(|item| item.evaluate(namespace)).collect::<Result<_>>()?,
            )),
            Expression::Not(inner) => Ok(Value::Bool(!is_truthy(&inner.evaluate(namespace)?))),
            Expression::And(left, right) => Ok(Value::Bool(
                is_truthy(&left.evaluate(namespace)?) && is_truthy(&right.evaluate(namespace)?),
            )),
            Expression::Or(left, right) => Ok(Value::Bool(
                is_truthy(&left.evaluate(namespace)?) || is_truthy(&right.evaluate(namespace)?),
            )),
            Expression::Compare { left, operator, right } => {
                let left = left.evaluate(namespace)?;
                let right = right.evaluate(namespace)?;
                let result = match operator {
                    Comparison::Equal => left == right,
                    Comparison::NotEqual => left != right,
                    Comparison::In => contains(&right, &left)?,
                    Comparison::NotIn => !contains(&right, &left)?,
                };
                Ok(Value::Bool(result))
            }
        }
    }
}

fn resolve_name(path: &[String], namespace: &dyn ConditionNamespace) -> Result<Value> {
    let (first, attributes) = match path.split_first() {
        Some(parts) => parts,
        None => return Err(Error::ConditionError("empty name".to_string())),
    };
    let mut value = namespace
        .lookup(first)
        .ok_or_else(|| Error::ConditionError(format!("name '{first}' is not defined")))?;
    for attribute in attributes {
        value = value.get(attribute).cloned().ok_or_else(|| {
            Error::ConditionError(format!("'{first}' has no attribute '{attribute}'"))
        })?;
    }
    Ok(value)
}

fn contains(container: &Value, item: &Value) -> Result<bool> {
    match (container, item) {
        (Value::Array(items), _) => Ok(items.contains(item)),
        (Value::String(text), Value::String(part)) => Ok(text.contains(part.as_str())),
        (Value::Object(fields), Value::String(key)) => Ok(fields.contains_key(key)),
        _ => Err(Error::ConditionError(format!(
            "unsupported operand types for 'in': {item} and {container}"
        ))),
    }
}

/// A parsed condition together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expression: Expression,
}

impl Condition {
    /// Parses a condition expression.
    ///
    /// # Errors
    /// * `Error::ConfigurationError` on any syntax error
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser::new(tokens);
        let expression = parser.parse_or()?;
        parser.consume(Token::Eof)?;
        Ok(Self { source: source.to_string(), expression })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Evaluates the condition against `namespace`.
    ///
    /// # Errors
    /// * `Error::ConditionError` for undefined names or unsupported operands
    pub fn evaluate(&self, namespace: &dyn ConditionNamespace) -> Result<bool> {
        Ok(is_truthy(&self.expression.evaluate(namespace)?))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
