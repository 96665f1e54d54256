//! The default expression parser.
//!
//! Expression text is turned into an [`Expr`] by a recursive-descent parser
//! over the tokens of [`Lexer`]. The engine only depends on the
//! [`ExpressionParser`] trait, so hosts can plug in their own grammar.
//!
//! Precedence, from loosest to tightest:
//!
//! | Level | Operators |
//! |---|---|
//! | transform | `->` |
//! | pair | `:` |
//! | or | `\|\|` |
//! | and | `&&` |
//! | equality | `==` `!=` `=~` |
//! | comparison | `<` `<=` `>` `>=` `<=>` |
//! | range | `..` |
//! | concat | `&` |
//! | additive | `+` `-` |
//! | multiplicative | `*` `/` `%` |
//! | power | `^` |
//! | unary | `!` `-` `+` |
//! | postfix | `[key]` |

use std::fmt;
use std::mem;

use crate::ast::{Expr, KeySegment, Lexeme, Operator, Token};
use crate::lexer::{Lexer, Location};
use crate::number::Number;
use crate::value::{Pattern, Value};

/// Turns expression source into an AST.
pub trait ExpressionParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<Expr, ParseError>;
}

/// The built-in grammar.
#[derive(Debug, Clone, Copy)]
pub struct DefaultParser {
    /// Build numeric literals as exact decimals
    exact_numbers: bool,
}

impl DefaultParser {
    pub fn new() -> Self {
        DefaultParser {
            exact_numbers: true,
        }
    }

    pub fn with_exact_numbers(exact_numbers: bool) -> Self {
        DefaultParser { exact_numbers }
    }
}

impl Default for DefaultParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionParser for DefaultParser {
    fn parse(&self, source: &str) -> Result<Expr, ParseError> {
        Parser::new(Lexer::new(source), self.exact_numbers)
            .and_then(Parser::parse)
            .map_err(|e| e.with_source(source))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A syntax error with the location range it covers.
///
/// Once [`with_source`](ParseError::with_source) has attached the expression
/// text, the error displays as an editor-style block:
///
/// ```text
/// Error while parsing:
/// $a + * 2
///      ^
/// Unexpected '*'
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub start: Location,
    pub end: Location,
    /// The line before the offending one, when there is one
    pub previous_line: Option<String>,
    /// The offending source line
    pub line: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, start: Location, end: Location) -> Self {
        ParseError {
            message: message.into(),
            start,
            end,
            previous_line: None,
            line: None,
        }
    }

    /// Attaches the offending line (and the one before it) from `source`.
    pub fn with_source(mut self, source: &str) -> Self {
        let lines: Vec<&str> = source.lines().collect();
        let index = self.start.line.saturating_sub(1);
        self.line = Some(lines.get(index).copied().unwrap_or("").to_string());
        self.previous_line = index
            .checked_sub(1)
            .and_then(|i| lines.get(i))
            .map(|line| line.to_string());
        self
    }

    /// Columns covered on the first line, as a 1-based inclusive range.
    pub fn columns(&self) -> (usize, usize) {
        let width = if self.end.line == self.start.line {
            self.end.column.saturating_sub(self.start.column)
        } else {
            let length = self.line.as_deref().map_or(0, |l| l.chars().count());
            (length + 1).saturating_sub(self.start.column)
        };
        let width = width.max(1);
        let first = self.start.column.max(1);
        (first, first + width - 1)
    }

    /// The `   ^^^` line pointing at the error.
    pub fn pointer(&self) -> String {
        let (first, last) = self.columns();
        format!("{}{}", " ".repeat(first.saturating_sub(1)), "^".repeat(last - first + 1))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(line) = &self.line else {
            return write!(f, "Parse error at {}: {}", self.start, self.message);
        };
        writeln!(f, "Error while parsing:")?;
        if let Some(previous) = &self.previous_line {
            writeln!(f, "{}", previous)?;
        }
        writeln!(f, "{}", line)?;
        writeln!(f, "{}", self.pointer())?;
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// Parser
// ============================================================================

pub struct Parser {
    lexer: Lexer,
    current: Lexeme,
    exact_numbers: bool,
}

impl Parser {
    pub fn new(mut lexer: Lexer, exact_numbers: bool) -> Result<Self, ParseError> {
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            exact_numbers,
        })
    }

    /// Parses a complete expression. Empty input yields `undefined`.
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Eof) {
            return Ok(Expr::Literal(Value::Undefined));
        }
        let expr = self.parse_expression()?;
        if !self.check(&Token::Eof) {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn advance(&mut self) -> Result<Lexeme, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(mem::replace(&mut self.current, next))
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current.token) == mem::discriminant(token)
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<Lexeme, ParseError> {
        if !self.check(&expected) {
            return Err(self.error(format!("Expected {}", what)));
        }
        self.advance()
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current.start, self.current.end)
    }

    fn unexpected(&self) -> ParseError {
        match &self.current.token {
            Token::Eof => self.error("Unexpected end of expression"),
            token => self.error(format!("Unexpected '{}'", token)),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_arrow()
    }

    /// `input -> template` is sugar for `transform(input template)`
    fn parse_arrow(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_pair()?;
        while self.check(&Token::Arrow) {
            self.advance()?;
            let right = self.parse_pair()?;
            left = Expr::helper("transform", vec![left, right]);
        }
        Ok(left)
    }

    fn parse_pair(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_or()?;
        if self.check(&Token::Colon) {
            self.advance()?;
            let right = self.parse_pair()?;
            return Ok(Expr::operation(Operator::Pair, vec![left, right]));
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.check(&Token::OrOr) {
            self.advance()?;
            let right = self.parse_and()?;
            left = Expr::operation(Operator::Or, vec![left, right]);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.check(&Token::AndAnd) {
            self.advance()?;
            let right = self.parse_equality()?;
            left = Expr::operation(Operator::And, vec![left, right]);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current.token {
                Token::EqEq => Operator::Equal,
                Token::NotEq => Operator::NotEqual,
                Token::Match => Operator::Matches,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_comparison()?;
            left = Expr::operation(op, vec![left, right]);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_range()?;
        loop {
            let op = match self.current.token {
                Token::Lt => Operator::Less,
                Token::LtEq => Operator::LessEqual,
                Token::Gt => Operator::Greater,
                Token::GtEq => Operator::GreaterEqual,
                Token::Spaceship => Operator::Compare,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_range()?;
            left = Expr::operation(op, vec![left, right]);
        }
        Ok(left)
    }

    fn parse_range(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_concat()?;
        if self.check(&Token::DotDot) {
            self.advance()?;
            let right = self.parse_concat()?;
            return Ok(Expr::operation(Operator::Range, vec![left, right]));
        }
        Ok(left)
    }

    fn parse_concat(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        while self.check(&Token::Ampersand) {
            self.advance()?;
            let right = self.parse_additive()?;
            left = Expr::operation(Operator::Concat, vec![left, right]);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current.token {
                Token::Plus => Operator::Add,
                Token::Minus => Operator::Subtract,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expr::operation(op, vec![left, right]);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.current.token {
                Token::Star => Operator::Multiply,
                Token::Slash => Operator::Divide,
                Token::Percent => Operator::Modulo,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_power()?;
            left = Expr::operation(op, vec![left, right]);
        }
        Ok(left)
    }

    /// Right-associative: `2 ^ 3 ^ 2` is `2 ^ 9`
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_unary()?;
        if self.check(&Token::Caret) {
            self.advance()?;
            let exponent = self.parse_power()?;
            return Ok(Expr::operation(Operator::Power, vec![base, exponent]));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.current.token {
            Token::Bang => {
                self.advance()?;
                let operand = self.parse_unary()?;
                Ok(Expr::operation(Operator::Not, vec![operand]))
            }
            Token::Minus => {
                self.advance()?;
                match self.parse_unary()? {
                    // Fold negative literals so `-1` stays a constant
                    Expr::Literal(Value::Number(n)) => Ok(Expr::Literal(Value::Number(n.negate()))),
                    operand => Ok(Expr::operation(
                        Operator::Subtract,
                        vec![Expr::Literal(Value::Number(self.number_zero())), operand],
                    )),
                }
            }
            Token::Plus => {
                self.advance()?;
                self.parse_unary()
            }
            _ => self.parse_postfix(),
        }
    }

    fn number_zero(&self) -> Number {
        if self.exact_numbers {
            Number::Decimal(rust_decimal::Decimal::ZERO)
        } else {
            Number::Integer(0)
        }
    }

    /// Parse key access written directly after an operand: `$a[0]`, `(x)['k']`
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        while self.check(&Token::LBracket) && !self.current.spaced {
            self.advance()?; // Consume '['
            let key = self.parse_expression()?;
            self.expect(Token::RBracket, "']' after key")?;
            let segment = Self::key_segment(key);

            expr = match expr {
                Expr::Variable { root, mut keys } => {
                    keys.push(segment);
                    Expr::Variable { root, keys }
                }
                other => Expr::Variable {
                    root: Some(Box::new(other)),
                    keys: vec![segment],
                },
            };
        }
        Ok(expr)
    }

    fn key_segment(key: Expr) -> KeySegment {
        match key {
            Expr::Literal(Value::String(name)) => KeySegment::Key(name),
            Expr::Literal(Value::Number(n)) => match n.as_i64() {
                Some(index) => KeySegment::Index(index),
                None => KeySegment::Computed(Box::new(Expr::Literal(Value::Number(n)))),
            },
            other => KeySegment::Computed(Box::new(other)),
        }
    }

    fn path_keys(path: String) -> Vec<KeySegment> {
        if path.is_empty() {
            Vec::new()
        } else if path.contains(['.', '\\']) {
            vec![KeySegment::Dotted(path)]
        } else {
            vec![KeySegment::Key(path)]
        }
    }

    /// Parse primary expressions (atoms): literals, variables, helper calls,
    /// groups, arrays and objects
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let lexeme = self.advance()?;
        match lexeme.token {
            Token::Number(text) => self.number_literal(&text, lexeme.start, lexeme.end),
            Token::String(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Regex { source, flags } => match Pattern::new(&source, &flags) {
                Ok(pattern) => Ok(Expr::Literal(Value::Regex(pattern))),
                Err(e) => Err(ParseError::new(
                    format!("Invalid regular expression: {}", e),
                    lexeme.start,
                    lexeme.end,
                )),
            },
            Token::Boolean(b) => Ok(Expr::Literal(Value::Boolean(b))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Undefined => Ok(Expr::Literal(Value::Undefined)),

            Token::Variable(path) => Ok(Expr::Variable {
                root: None,
                keys: Self::path_keys(path),
            }),

            Token::Identifier(name) => {
                if self.check(&Token::LParen) && !self.current.spaced {
                    self.advance()?;
                    let args = self.parse_elements(Token::RParen, "')' after arguments")?;
                    Ok(Expr::HelperCall { name, args })
                } else {
                    // Bare words are strings
                    Ok(Expr::Literal(Value::String(name)))
                }
            }

            Token::LParen => {
                let inner = self.parse_expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(Expr::operation(Operator::Group, vec![inner]))
            }

            // Array literals
            Token::LBracket => {
                let elements = self.parse_elements(Token::RBracket, "']' after array elements")?;
                Ok(Expr::operation(Operator::Array, elements))
            }

            // Object literals: `{ 'k': v }`, `{ 'a': 1, 'b': 2 }`, `{ [k v] [k v] }`
            Token::LBrace => {
                let mut elements = self.parse_elements(Token::RBrace, "'}' after object entries")?;
                let arg = if elements.len() == 1 {
                    elements.remove(0)
                } else {
                    Expr::operation(Operator::Array, elements)
                };
                Ok(Expr::operation(Operator::Object, vec![arg]))
            }

            token => {
                let message = match token {
                    Token::Eof => "Unexpected end of expression".to_string(),
                    other => format!("Unexpected '{}'", other),
                };
                Err(ParseError::new(message, lexeme.start, lexeme.end))
            }
        }
    }

    /// Parses expressions up to `close`, separated by whitespace or commas.
    fn parse_elements(&mut self, close: Token, what: &str) -> Result<Vec<Expr>, ParseError> {
        let mut elements = Vec::new();
        loop {
            while self.check(&Token::Comma) {
                self.advance()?;
            }
            if self.check(&close) {
                self.advance()?;
                return Ok(elements);
            }
            if self.check(&Token::Eof) {
                return Err(self.error(format!("Expected {}", what)));
            }
            elements.push(self.parse_expression()?);
        }
    }

    fn number_literal(&self, text: &str, start: Location, end: Location) -> Result<Expr, ParseError> {
        let number = if self.exact_numbers {
            Number::parse(text)
        } else {
            text.parse::<f64>().ok().map(Number::from_f64)
        };
        match number {
            Some(n) => Ok(Expr::Literal(Value::Number(n))),
            None => Err(ParseError::new(
                format!("Invalid number literal '{}'", text),
                start,
                end,
            )),
        }
    }
}
