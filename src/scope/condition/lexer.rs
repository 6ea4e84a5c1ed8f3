// SPDX-License-Identifier: MIT

//! Tokenizer for predicate text

use crate::dsl::error::ScopeError;

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(String),
    Identifier(String),
    True,
    False,
    Null,

    AndAnd,
    OrOr,
    Bang,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Colon,
    Dot,

    Eof,
}

/// A token with its byte span in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl TokenKind {
    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::String(s) => format!("string {:?}", s),
            TokenKind::Identifier(name) => format!("'{}'", name),
            TokenKind::Eof => "end of expression".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Bang => "!",
            TokenKind::Equal => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            _ => "",
        }
    }
}

/// Splits predicate text into tokens
pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    index: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            index: 0,
        }
    }

    /// Tokenize the whole input; the last token is always `Eof`
    pub fn tokenize(mut self) -> Result<Vec<Token>, ScopeError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.index).map(|(_, c)| *c)
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.index)
            .map(|(i, _)| *i)
            .unwrap_or(self.source.len())
    }

    fn advance(&mut self) {
        if self.index < self.chars.len() {
            self.index += 1;
        }
    }

    fn error(&self, message: impl Into<String>, start: usize) -> ScopeError {
        ScopeError::syntax(message, fragment(self.source, start), start)
    }

    fn next_token(&mut self) -> Result<Token, ScopeError> {
        while self.current().is_some_and(char::is_whitespace) {
            self.advance();
        }

        let start = self.offset();
        let Some(c) = self.current() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                start,
                end: start,
            });
        };

        let kind = match c {
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            '[' => self.single(TokenKind::LeftBracket),
            ']' => self.single(TokenKind::RightBracket),
            '{' => self.single(TokenKind::LeftBrace),
            '}' => self.single(TokenKind::RightBrace),
            ',' => self.single(TokenKind::Comma),
            ':' => self.single(TokenKind::Colon),
            '.' => self.single(TokenKind::Dot),
            '&' if self.peek(1) == Some('&') => self.double(TokenKind::AndAnd),
            '|' if self.peek(1) == Some('|') => self.double(TokenKind::OrOr),
            '=' if self.peek(1) == Some('=') => self.double(TokenKind::Equal),
            '!' if self.peek(1) == Some('=') => self.double(TokenKind::NotEqual),
            '!' => self.single(TokenKind::Bang),
            '<' if self.peek(1) == Some('=') => self.double(TokenKind::LessEqual),
            '<' => self.single(TokenKind::Less),
            '>' if self.peek(1) == Some('=') => self.double(TokenKind::GreaterEqual),
            '>' => self.single(TokenKind::Greater),
            '"' | '\'' => self.read_string(c, start)?,
            '-' if self.peek(1).is_some_and(|n| n.is_ascii_digit()) => self.read_number(start)?,
            c if c.is_ascii_digit() => self.read_number(start)?,
            c if is_identifier_start(c) => self.read_identifier(),
            other => return Err(self.error(format!("Unexpected character '{}'", other), start)),
        };

        Ok(Token {
            kind,
            start,
            end: self.offset(),
        })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn double(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        self.advance();
        kind
    }

    fn read_identifier(&mut self) -> TokenKind {
        let start = self.offset();
        while self.current().is_some_and(is_identifier_part) {
            self.advance();
        }
        match &self.source[start..self.offset()] {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            word => TokenKind::Identifier(word.to_string()),
        }
    }

    fn read_number(&mut self, start: usize) -> Result<TokenKind, ScopeError> {
        if self.current() == Some('-') {
            self.advance();
        }
        self.read_digits();

        if self.current() == Some('.') && self.peek(1).is_some_and(|n| n.is_ascii_digit()) {
            self.advance();
            self.read_digits();
        }

        if matches!(self.current(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.current(), Some('+') | Some('-')) {
                self.advance();
            }
            if !self.current().is_some_and(|n| n.is_ascii_digit()) {
                return Err(self.error("Malformed number exponent", start));
            }
            self.read_digits();
        }

        if self.current().is_some_and(is_identifier_start) {
            return Err(self.error("Malformed number", start));
        }

        let text = &self.source[start..self.offset()];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(format!("Invalid number: {}", text), start))
    }

    fn read_digits(&mut self) {
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn read_string(&mut self, quote: char, start: usize) -> Result<TokenKind, ScopeError> {
        self.advance();
        let mut value = String::new();

        loop {
            match self.current() {
                None => return Err(self.error("Unclosed string literal", start)),
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(TokenKind::String(value));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = self.read_escape(start)?;
                    value.push(escaped);
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_escape(&mut self, start: usize) -> Result<char, ScopeError> {
        let Some(c) = self.current() else {
            return Err(self.error("Unclosed string literal", start));
        };
        self.advance();

        let escaped = match c {
            '"' => '"',
            '\'' => '\'',
            '\\' => '\\',
            '/' => '/',
            'b' => '\u{0008}',
            'f' => '\u{000C}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'u' => {
                let mut code = 0u32;
                for _ in 0..4 {
                    let digit = self
                        .current()
                        .and_then(|h| h.to_digit(16))
                        .ok_or_else(|| self.error("Invalid unicode escape", start))?;
                    code = code * 16 + digit;
                    self.advance();
                }
                char::from_u32(code).ok_or_else(|| self.error("Invalid unicode escape", start))?
            }
            other => return Err(self.error(format!("Invalid escape sequence: \\{}", other), start)),
        };
        Ok(escaped)
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// The unparsed remainder starting at `start`, shortened for messages
pub(crate) fn fragment(source: &str, start: usize) -> String {
    const MAX: usize = 40;
    let rest = source.get(start..).unwrap_or("").trim_end();
    if rest.chars().count() > MAX {
        let cut: String = rest.chars().take(MAX).collect();
        format!("{}...", cut)
    } else {
        rest.to_string()
    }
}
