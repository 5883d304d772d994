//! Series expression parser
//!
//! Grammar, scanned left to right without backtracking:
//!
//! ```text
//! expr    := const | name | name '(' args ')'
//! const   := [0-9]+
//! name    := [a-zA-Z0-9._*-]*
//! args    := expr ( (',' | ' ') expr )*
//! ```
//!
//! A leading digit selects a constant; otherwise a name is read and a `(`
//! immediately after it turns the name into a function call.

use crate::ast::Expr;
use crate::error::ParseError;
use std::str::FromStr;

/// Deepest nesting of function calls accepted by [`ExprParser`]
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parser for series expressions
pub struct ExprParser;

impl ExprParser {
    /// Parse one expression from the front of `input`.
    ///
    /// Returns the expression and whatever input was not consumed.
    pub fn parse(input: &str) -> Result<(Expr, &str), ParseError> {
        if input.is_empty() {
            return Err(ParseError::EmptyExpression);
        }

        let mut cursor = Cursor::new(input);
        let expr = cursor.parse_expr()?;
        Ok((expr, cursor.rest()))
    }

    /// Parse an expression that must span the whole input
    pub fn parse_complete(input: &str) -> Result<Expr, ParseError> {
        let (expr, rest) = Self::parse(input)?;
        if !rest.is_empty() {
            return Err(ParseError::TrailingInput {
                position: input.len() - rest.len(),
                remainder: rest.to_string(),
            });
        }
        Ok(expr)
    }
}

impl FromStr for Expr {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExprParser::parse_complete(s)
    }
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-' | b'*')
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
    /// Number of argument lists currently open
    depth: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    /// Advance over bytes matching `pred` and return the consumed slice
    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        if self.peek().is_some_and(|b| b.is_ascii_digit()) {
            return self.parse_const();
        }

        let name = self.take_while(is_name_char);

        if self.peek() == Some(b'(') {
            let (args, raw_args) = self.parse_arg_list()?;
            return Ok(Expr::Call {
                name: name.to_string(),
                args,
                raw_args: raw_args.to_string(),
            });
        }

        Ok(Expr::metric(name))
    }

    fn parse_const(&mut self) -> Result<Expr, ParseError> {
        let position = self.pos;
        let literal = self.take_while(|b| b.is_ascii_digit());

        let invalid = |reason: String| ParseError::InvalidNumber {
            literal: literal.to_string(),
            position,
            reason,
        };

        let value = literal
            .parse::<f64>()
            .map_err(|e| invalid(e.to_string()))?;
        if !value.is_finite() {
            return Err(invalid("value out of range".to_string()));
        }

        Ok(Expr::Const {
            value,
            literal: literal.to_string(),
        })
    }

    /// Parse `( args )`, positioned on the opening paren.
    /// Returns the arguments and the raw text between the parens.
    fn parse_arg_list(&mut self) -> Result<(Vec<Expr>, &'a str), ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeep {
                position: self.pos,
                max_depth: MAX_NESTING_DEPTH,
            });
        }

        self.depth += 1;
        let result = self.parse_args();
        self.depth -= 1;
        result
    }

    fn parse_args(&mut self) -> Result<(Vec<Expr>, &'a str), ParseError> {
        self.pos += 1;
        let start = self.pos;
        let mut args = Vec::new();

        loop {
            if self.peek().is_none() {
                return Err(ParseError::MissingComma { position: self.pos });
            }

            args.push(self.parse_expr()?);

            match self.peek() {
                None => return Err(ParseError::MissingComma { position: self.pos }),
                Some(b')') => {
                    let raw_args = &self.input[start..self.pos];
                    self.pos += 1;
                    return Ok((args, raw_args));
                }
                Some(b',') | Some(b' ') => self.pos += 1,
                Some(_) => {
                    let ch = self.rest().chars().next().unwrap_or_default();
                    return Err(ParseError::UnexpectedCharacter {
                        ch,
                        position: self.pos,
                    });
                }
            }
        }
    }
}
