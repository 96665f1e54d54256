use std::fmt;

use crate::lexer::Location;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Numeric literal, kept as normalized decimal text so the parser can
    /// build an exact or a native number
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.14
    /// 1e3
    /// 0xff      // lexed as "255"
    /// ```
    Number(String),

    /// String literal in single, double or back quotes
    ///
    /// # Examples
    /// ```text
    /// 'hello'
    /// "item #1"
    /// `it's`
    /// ```
    String(String),

    /// Regular expression literal
    ///
    /// # Examples
    /// ```text
    /// /^\d+$/
    /// /colou?r/gi
    /// ```
    Regex { source: String, flags: String },

    /// Boolean values
    Boolean(bool),

    /// Null value
    Null,

    /// Undefined value (`undefined` or `undef`)
    Undefined,

    // References
    /// Variable path following `$`, without the sigil
    ///
    /// # Examples
    /// ```text
    /// $             // Variable("")
    /// $.            // Variable("")
    /// $user.name    // Variable("user.name")
    /// $.0           // Variable("0")
    /// ${a.b}        // Variable("a.b")
    /// ```
    Variable(String),

    /// Bare word or helper name
    ///
    /// Symbolic helper names (`?`, `&`, `#`, `@`, `^`, `\`, `∪`, ...) are
    /// lexed as identifiers when a `(` follows immediately.
    ///
    /// # Examples
    /// ```text
    /// map
    /// math.abs
    /// ?
    /// ```
    Identifier(String),

    // Delimiters
    /// Left parenthesis for grouping or helper calls
    LParen,
    /// Right parenthesis
    RParen,
    /// Left bracket for arrays and key access
    LBracket,
    /// Right bracket
    RBracket,
    /// Left brace for object literals
    LBrace,
    /// Right brace
    RBrace,
    /// Comma between arguments or elements
    Comma,
    /// Pair constructor
    Colon,
    /// Transform sugar (`->`)
    Arrow,

    // Operators
    /// Logical AND
    AndAnd,
    /// Logical OR
    OrOr,
    /// Concatenation
    Ampersand,
    /// Logical NOT
    Bang,
    /// Equality (`==`, `===`)
    EqEq,
    /// Inequality (`!=`, `!==`)
    NotEq,
    /// Regex match (`=~`)
    Match,
    /// Less than
    Lt,
    /// Less than or equal
    LtEq,
    /// Greater than
    Gt,
    /// Greater than or equal
    GtEq,
    /// Three-way comparison (`<=>`)
    Spaceship,
    /// Addition
    Plus,
    /// Subtraction or negation
    Minus,
    /// Multiplication
    Star,
    /// Division
    Slash,
    /// Remainder
    Percent,
    /// Exponentiation
    Caret,
    /// Range (`..`)
    DotDot,

    /// End of input
    Eof,
}

impl Token {
    /// True for tokens that complete an operand, after which a `/` means
    /// division rather than the start of a regex literal.
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Number(_)
                | Token::String(_)
                | Token::Regex { .. }
                | Token::Boolean(_)
                | Token::Null
                | Token::Undefined
                | Token::Variable(_)
                | Token::Identifier(_)
                | Token::RParen
                | Token::RBracket
                | Token::RBrace
        )
    }
}

/// Renders the token the way it reads in source text.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Number(text) => return write!(f, "{}", text),
            Token::String(s) => return write!(f, "\"{}\"", s),
            Token::Regex { source, flags } => return write!(f, "/{}/{}", source, flags),
            Token::Boolean(b) => return write!(f, "{}", b),
            Token::Variable(path) => return write!(f, "${}", path),
            Token::Identifier(name) => return write!(f, "{}", name),
            Token::Null => "null",
            Token::Undefined => "undefined",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Arrow => "->",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Ampersand => "&",
            Token::Bang => "!",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Match => "=~",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Gt => ">",
            Token::GtEq => ">=",
            Token::Spaceship => "<=>",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Caret => "^",
            Token::DotDot => "..",
            Token::Eof => "end of expression",
        };
        f.write_str(text)
    }
}

/// A token together with where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub start: Location,
    pub end: Location,
    /// Whitespace or a comment came right before the token
    pub spaced: bool,
}
