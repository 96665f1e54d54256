use std::fmt;

use crate::ast::{Lexeme, Token};
use crate::parser::ParseError;

/// Symbols that name helpers when written directly before `(`.
const SYMBOL_HELPERS: &[char] = &['?', '&', '#', '@', '^', '\\', '∩', '∪', '∖', '∈', '⊂', '⊆'];

/// A 1-based line and column in expression source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Location { line, column }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location { line: 1, column: 1 }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    /// The next token starts an operand, so `/` opens a regex literal and a
    /// symbol followed by `(` names a helper.
    operand_expected: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            operand_expected: true,
        }
    }

    /// Lexes the whole input, ending with an `Eof` lexeme.
    pub fn tokenize(mut self) -> Result<Vec<Lexeme>, ParseError> {
        let mut lexemes = Vec::new();
        loop {
            let lexeme = self.next_token()?;
            let done = lexeme.token == Token::Eof;
            lexemes.push(lexeme);
            if done {
                return Ok(lexemes);
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn error(&self, message: impl Into<String>, start: Location) -> ParseError {
        ParseError::new(message, start, self.location())
    }

    /// Skips whitespace and comments, reporting whether anything was skipped.
    fn skip_trivia(&mut self) -> Result<bool, ParseError> {
        let mut skipped = false;
        loop {
            match (self.current_char(), self.peek_char(1)) {
                (Some(ch), _) if ch.is_whitespace() => self.advance(),
                (Some('/'), Some('/')) => {
                    while let Some(ch) = self.current_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.location();
                    self.advance_by(2);
                    loop {
                        match (self.current_char(), self.peek_char(1)) {
                            (Some('*'), Some('/')) => {
                                self.advance_by(2);
                                break;
                            }
                            (Some(_), _) => self.advance(),
                            (None, _) => return Err(self.error("Unterminated comment", start)),
                        }
                    }
                }
                _ => return Ok(skipped),
            }
            skipped = true;
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else if ch == '.' && self.peek_char(1).is_some_and(|c| c.is_alphanumeric()) {
                // Namespaced helpers such as `math.abs`
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, ParseError> {
        let start = self.location();
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some(ch) => result.push(ch),
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error("Unterminated string: missing closing quote", start))
    }

    fn read_regex(&mut self) -> Result<Token, ParseError> {
        let start = self.location();
        let mut source = String::new();
        self.advance(); // Consume opening slash

        loop {
            match self.current_char() {
                Some('/') => {
                    self.advance();
                    break;
                }
                Some('\\') if self.peek_char(1) == Some('/') => {
                    source.push('/');
                    self.advance_by(2);
                }
                Some('\\') => {
                    source.push('\\');
                    self.advance();
                    if let Some(ch) = self.current_char() {
                        source.push(ch);
                        self.advance();
                    }
                }
                Some('\n') | None => {
                    return Err(self.error("Unterminated regular expression", start));
                }
                Some(ch) => {
                    source.push(ch);
                    self.advance();
                }
            }
        }

        let mut flags = String::new();
        while let Some(ch) = self.current_char() {
            if !ch.is_ascii_alphabetic() {
                break;
            }
            flags.push(ch);
            self.advance();
        }
        Ok(Token::Regex { source, flags })
    }

    fn read_number(&mut self) -> Result<Token, ParseError> {
        let start = self.location();

        if self.current_char() == Some('0') {
            let radix = match self.peek_char(1) {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance_by(2);
                let mut digits = String::new();
                while let Some(ch) = self.current_char() {
                    if ch.is_digit(radix) {
                        digits.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                }
                return match i64::from_str_radix(&digits, radix) {
                    Ok(n) => Ok(Token::Number(n.to_string())),
                    Err(_) => Err(self.error("Invalid number literal", start)),
                };
            }
        }

        let mut number = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // A dot starts a fraction unless it is the `..` range operator
        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            if number.is_empty() {
                number.push('0');
            }
            number.push('.');
            self.advance();
            while let Some(ch) = self.current_char() {
                if ch.is_ascii_digit() {
                    number.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if matches!(self.current_char(), Some('e' | 'E')) {
            let sign = matches!(self.peek_char(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_char(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                number.push('e');
                self.advance();
                if sign {
                    number.push(self.current_char().unwrap_or('+'));
                    self.advance();
                }
                while let Some(ch) = self.current_char() {
                    if ch.is_ascii_digit() {
                        number.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        Ok(Token::Number(number))
    }

    fn is_path_char(ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '\\'
    }

    fn read_variable(&mut self) -> Result<Token, ParseError> {
        let start = self.location();
        self.advance(); // Consume '$'

        if self.current_char() == Some('{') {
            self.advance();
            let mut path = String::new();
            loop {
                match self.current_char() {
                    Some('}') => {
                        self.advance();
                        return Ok(Token::Variable(path));
                    }
                    Some(ch) => {
                        path.push(ch);
                        self.advance();
                    }
                    None => return Err(self.error("Unterminated variable: missing '}'", start)),
                }
            }
        }

        // `$.` is the current value, `$.a` the same as `$a`
        if self.current_char() == Some('.') && self.peek_char(1) != Some('.') {
            self.advance();
        }

        let mut path = String::new();
        while let Some(ch) = self.current_char() {
            match ch {
                '\\' => {
                    path.push(ch);
                    self.advance();
                    if let Some(escaped) = self.current_char() {
                        path.push(escaped);
                        self.advance();
                    }
                }
                '.' if self.peek_char(1).is_some_and(Self::is_path_char) => {
                    path.push(ch);
                    self.advance();
                }
                c if Self::is_path_char(c) => {
                    path.push(c);
                    self.advance();
                }
                _ => break,
            }
        }
        Ok(Token::Variable(path))
    }

    /// A `/` opens a regex in operand position, or when it is written like
    /// an argument (`split($s /,/)`) and a closing slash follows on the line.
    fn regex_allowed(&self, spaced: bool) -> bool {
        if self.operand_expected {
            return true;
        }
        if !spaced || self.peek_char(1).is_none_or(char::is_whitespace) {
            return false;
        }
        self.input[self.position + 1..]
            .iter()
            .take_while(|&&c| c != '\n')
            .any(|&c| c == '/')
    }

    pub fn next_token(&mut self) -> Result<Lexeme, ParseError> {
        let spaced = self.skip_trivia()?;
        let start = self.location();
        let token = self.read_token(spaced)?;
        self.operand_expected = !token.ends_operand();
        Ok(Lexeme {
            token,
            start,
            end: self.location(),
            spaced,
        })
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn pair(&mut self, token: Token) -> Token {
        self.advance_by(2);
        token
    }

    fn read_token(&mut self, spaced: bool) -> Result<Token, ParseError> {
        let start = self.location();
        let Some(ch) = self.current_char() else {
            return Ok(Token::Eof);
        };

        if self.operand_expected && SYMBOL_HELPERS.contains(&ch) && self.peek_char(1) == Some('(') {
            self.advance();
            return Ok(Token::Identifier(ch.to_string()));
        }

        let token = match ch {
            '$' => self.read_variable()?,
            '"' | '\'' | '`' => Token::String(self.read_string(ch)?),
            c if c.is_ascii_digit() => self.read_number()?,
            '.' if self.peek_char(1) == Some('.') => self.pair(Token::DotDot),
            '.' if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number()?,
            '/' if self.regex_allowed(spaced) => self.read_regex()?,
            '/' => self.single(Token::Slash),
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            '[' => self.single(Token::LBracket),
            ']' => self.single(Token::RBracket),
            '{' => self.single(Token::LBrace),
            '}' => self.single(Token::RBrace),
            ',' => self.single(Token::Comma),
            ':' => self.single(Token::Colon),
            '+' => self.single(Token::Plus),
            '*' => self.single(Token::Star),
            '%' => self.single(Token::Percent),
            '^' => self.single(Token::Caret),
            '-' if self.peek_char(1) == Some('>') => self.pair(Token::Arrow),
            '-' => self.single(Token::Minus),
            '&' if self.peek_char(1) == Some('&') => self.pair(Token::AndAnd),
            '&' => self.single(Token::Ampersand),
            '|' if self.peek_char(1) == Some('|') => self.pair(Token::OrOr),
            '=' if self.peek_char(1) == Some('=') => {
                let token = self.pair(Token::EqEq);
                if self.current_char() == Some('=') {
                    self.advance();
                }
                token
            }
            '=' if self.peek_char(1) == Some('~') => self.pair(Token::Match),
            '!' if self.peek_char(1) == Some('=') => {
                let token = self.pair(Token::NotEq);
                if self.current_char() == Some('=') {
                    self.advance();
                }
                token
            }
            '!' => self.single(Token::Bang),
            '<' if self.peek_char(1) == Some('=') && self.peek_char(2) == Some('>') => {
                self.advance_by(3);
                Token::Spaceship
            }
            '<' if self.peek_char(1) == Some('=') => self.pair(Token::LtEq),
            '<' => self.single(Token::Lt),
            '>' if self.peek_char(1) == Some('=') => self.pair(Token::GtEq),
            '>' => self.single(Token::Gt),
            '|' => {
                self.advance();
                return Err(self.error("Unexpected '|' (did you mean '||'?)", start));
            }
            '=' => {
                self.advance();
                return Err(self.error("Unexpected '=' (did you mean '==' or '=~'?)", start));
            }
            c if c.is_alphabetic() || c == '_' => {
                let ident = self.read_identifier();
                match ident.as_str() {
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    "null" => Token::Null,
                    "undefined" | "undef" => Token::Undefined,
                    _ => Token::Identifier(ident),
                }
            }
            c => {
                self.advance();
                return Err(self.error(format!("Unexpected character '{}'", c), start));
            }
        };
        Ok(token)
    }
}

#[cfg(test)]
fn tokens(source: &str) -> Vec<Token> {
    Lexer::new(source)
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|lexeme| lexeme.token)
        .collect()
}

#[test]
fn test_keywords() {
    assert_eq!(
        tokens("true false null undefined undef"),
        vec![
            Token::Boolean(true),
            Token::Boolean(false),
            Token::Null,
            Token::Undefined,
            Token::Undefined,
            Token::Eof,
        ]
    );
}

#[test]
fn test_variables() {
    assert_eq!(
        tokens("$ $. $.0 $user.name ${a.b} $$x"),
        vec![
            Token::Variable(String::new()),
            Token::Variable(String::new()),
            Token::Variable("0".to_string()),
            Token::Variable("user.name".to_string()),
            Token::Variable("a.b".to_string()),
            Token::Variable("$x".to_string()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_variable_stops_before_range() {
    assert_eq!(
        tokens("$a..$b"),
        vec![
            Token::Variable("a".to_string()),
            Token::DotDot,
            Token::Variable("b".to_string()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_numbers() {
    assert_eq!(
        tokens("42 3.14 .5 1e3 0xff 0b101 1..3"),
        vec![
            Token::Number("42".to_string()),
            Token::Number("3.14".to_string()),
            Token::Number("0.5".to_string()),
            Token::Number("1e3".to_string()),
            Token::Number("255".to_string()),
            Token::Number("5".to_string()),
            Token::Number("1".to_string()),
            Token::DotDot,
            Token::Number("3".to_string()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_slash_is_context_sensitive() {
    assert_eq!(
        tokens("$a / 2"),
        vec![
            Token::Variable("a".to_string()),
            Token::Slash,
            Token::Number("2".to_string()),
            Token::Eof,
        ]
    );
    assert_eq!(
        tokens("split($s /,/i)"),
        vec![
            Token::Identifier("split".to_string()),
            Token::LParen,
            Token::Variable("s".to_string()),
            Token::Regex {
                source: ",".to_string(),
                flags: "i".to_string()
            },
            Token::RParen,
            Token::Eof,
        ]
    );
}

#[test]
fn test_symbol_helpers() {
    assert_eq!(
        tokens("?(1) $a & $b"),
        vec![
            Token::Identifier("?".to_string()),
            Token::LParen,
            Token::Number("1".to_string()),
            Token::RParen,
            Token::Variable("a".to_string()),
            Token::Ampersand,
            Token::Variable("b".to_string()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_comments_mark_spacing() {
    let lexemes = Lexer::new("1 /* note */+2 // tail").tokenize().unwrap();
    assert_eq!(lexemes[1].token, Token::Plus);
    assert!(lexemes[1].spaced);
    assert!(!lexemes[2].spaced);
    assert_eq!(lexemes[3].token, Token::Eof);
}

#[test]
fn test_locations() {
    let lexemes = Lexer::new("1 +\n  $x").tokenize().unwrap();
    assert_eq!(lexemes[2].start, Location::new(2, 3));
    assert_eq!(lexemes[2].end, Location::new(2, 5));
}

#[test]
fn test_unterminated_string() {
    let err = Lexer::new("'abc").tokenize().unwrap_err();
    assert_eq!(err.start, Location::new(1, 1));
}
