//! Formula evaluator for DvP amounts and parameters.
//!
//! Grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | atom
//! atom   := number | identifier | '(' expr ')'
//! ```

use crate::ports::outbound::{MathError, MathEvaluator};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Deepest nesting of parentheses and unary minus accepted.
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Decimal),
    Ident(String),
    Op(char),
    Open,
    Close,
}

fn tokenize(expression: &str) -> Result<Vec<(usize, Token)>, MathError> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < chars.len() {
        let c = chars[pos];
        if c.is_whitespace() {
            pos += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            let value = Decimal::from_str(&text).map_err(|err| MathError::Syntax {
                position: start,
                reason: err.to_string(),
            })?;
            tokens.push((start, Token::Number(value)));
        } else if c.is_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let name: String = chars[start..pos].iter().collect();
            tokens.push((start, Token::Ident(name.to_lowercase())));
        } else {
            let token = match c {
                '+' | '-' | '*' | '/' => Token::Op(c),
                '(' => Token::Open,
                ')' => Token::Close,
                other => {
                    return Err(MathError::Syntax {
                        position: pos,
                        reason: format!("unexpected character `{other}`"),
                    })
                }
            };
            tokens.push((pos, token));
            pos += 1;
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [(usize, Token)],
    pos: usize,
    end: usize,
    depth: usize,
    variables: &'a BTreeMap<String, Decimal>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, token)| token)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map(|(at, _)| *at).unwrap_or(self.end)
    }

    fn descend(&mut self) -> Result<(), MathError> {
        if self.depth >= MAX_NESTING {
            return Err(MathError::Syntax {
                position: self.position(),
                reason: format!("nesting deeper than {MAX_NESTING}"),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn expr(&mut self) -> Result<Decimal, MathError> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' {
                value.checked_add(rhs)
            } else {
                value.checked_sub(rhs)
            }
            .ok_or(MathError::Overflow)?;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<Decimal, MathError> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = if op == '*' {
                value.checked_mul(rhs).ok_or(MathError::Overflow)?
            } else {
                if rhs.is_zero() {
                    return Err(MathError::DivisionByZero);
                }
                value.checked_div(rhs).ok_or(MathError::Overflow)?
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<Decimal, MathError> {
        if let Some(Token::Op('-')) = self.peek() {
            self.descend()?;
            self.pos += 1;
            let value = self.unary();
            self.depth -= 1;
            return Ok(-value?);
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Decimal, MathError> {
        let position = self.position();
        match self.tokens.get(self.pos).map(|(_, token)| token.clone()) {
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                self.variables
                    .get(&name)
                    .copied()
                    .ok_or(MathError::UnknownVariable(name))
            }
            Some(Token::Open) => {
                self.descend()?;
                self.pos += 1;
                let value = self.expr();
                self.depth -= 1;
                let value = value?;
                match self.peek() {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(value)
                    }
                    _ => Err(MathError::Syntax {
                        position: self.position(),
                        reason: "expected `)`".to_string(),
                    }),
                }
            }
            Some(token) => Err(MathError::Syntax {
                position,
                reason: format!("unexpected token {token:?}"),
            }),
            None => Err(MathError::Syntax {
                position,
                reason: "unexpected end of expression".to_string(),
            }),
        }
    }
}

/// Evaluator for `+ - * /`, parentheses, unary minus and named variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleMathEvaluator;

impl SimpleMathEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl MathEvaluator for SimpleMathEvaluator {
    fn variables_within(&self, expression: &str) -> Result<BTreeSet<String>, MathError> {
        Ok(tokenize(expression)?
            .into_iter()
            .filter_map(|(_, token)| match token {
                Token::Ident(name) => Some(name),
                _ => None,
            })
            .collect())
    }

    fn evaluate(&self, expression: &str, variables: &BTreeMap<String, Decimal>) -> Result<Decimal, MathError> {
        let tokens = tokenize(expression)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            end: expression.chars().count(),
            depth: 0,
            variables,
        };
        let value = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(MathError::Syntax {
                position: parser.position(),
                reason: "trailing input".to_string(),
            });
        }
        Ok(value)
    }
}
