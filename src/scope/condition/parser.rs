//! Predicate expression parser
//!
//! Precedence, lowest first:
//! - `||` / `or`
//! - `&&` / `and`
//! - `==`, `!=`
//! - `<`, `<=`, `>`, `>=`
//! - `!` / `not ` prefix
//! - literals, `[...]`, `{...}`, `( ... )`, `name(args).chain`
//!
//! Inside an argument list a bare word such as `VALUE` or `foo.bar` is a
//! string literal; everywhere else a name must be followed by `(`.

use super::ast::{ChainStep, Expression, Invocation, Literal, Operator};
use super::lexer::{fragment, Lexer, Token, TokenKind};
use crate::dsl::error::ScopeError;

/// Parse a predicate string into an AST
pub fn parse(input: &str) -> Result<Expression, ScopeError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        source: input,
        tokens,
        position: 0,
        argument_depth: 0,
    };

    if parser.peek_kind() == &TokenKind::Eof {
        return Err(ScopeError::syntax("Empty expression", "", 0));
    }

    let expr = parser.parse_or()?;
    if parser.peek_kind() != &TokenKind::Eof {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    position: usize,
    argument_depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        // tokenize() always ends with Eof and we never advance past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.position + offset).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn error_at(&self, message: impl Into<String>, start: usize) -> ScopeError {
        ScopeError::syntax(message, fragment(self.source, start), start)
    }

    fn unexpected(&self) -> ScopeError {
        let token = self.peek();
        self.error_at(format!("Unexpected {}", token.kind.describe()), token.start)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ScopeError> {
        if self.peek_kind() == &kind {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(self.error_at(
                format!("Expected {}, found {}", what, token.kind.describe()),
                token.start,
            ))
        }
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Identifier(name) if name == word)
    }

    fn parse_or(&mut self) -> Result<Expression, ScopeError> {
        let first = self.parse_and()?;
        let mut operands = vec![first];

        while self.peek_kind() == &TokenKind::OrOr || self.is_word("or") {
            self.advance();
            operands.push(self.parse_and()?);
        }

        Ok(combine(Operator::Or, operands))
    }

    fn parse_and(&mut self) -> Result<Expression, ScopeError> {
        let first = self.parse_equality()?;
        let mut operands = vec![first];

        while self.peek_kind() == &TokenKind::AndAnd || self.is_word("and") {
            self.advance();
            operands.push(self.parse_equality()?);
        }

        Ok(combine(Operator::And, operands))
    }

    fn parse_equality(&mut self) -> Result<Expression, ScopeError> {
        let mut left = self.parse_relational()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Equal => Operator::Eq,
                TokenKind::NotEqual => Operator::NotEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expression::Invocation(Invocation::operator(op, vec![left, right]));
        }
    }

    fn parse_relational(&mut self) -> Result<Expression, ScopeError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => Operator::Lt,
                TokenKind::LessEqual => Operator::Lte,
                TokenKind::Greater => Operator::Gt,
                TokenKind::GreaterEqual => Operator::Gte,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Invocation(Invocation::operator(op, vec![left, right]));
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, ScopeError> {
        if self.peek_kind() == &TokenKind::Bang {
            self.advance();
            return Ok(self.parse_unary()?.negate());
        }

        if self.at_not_keyword() {
            self.advance();
            return Ok(self.parse_unary()?.negate());
        }

        self.parse_primary()
    }

    /// `not` followed by whitespace and the start of a term
    fn at_not_keyword(&self) -> bool {
        if !self.is_word("not") {
            return false;
        }
        let current = self.peek();
        let next = self.peek_at(1);
        let separated = next.start > current.end;
        let starts_term = matches!(
            next.kind,
            TokenKind::Identifier(_)
                | TokenKind::Number(_)
                | TokenKind::String(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::Bang
                | TokenKind::LeftParen
                | TokenKind::LeftBracket
                | TokenKind::LeftBrace
        );
        separated && starts_term
    }

    fn parse_primary(&mut self) -> Result<Expression, ScopeError> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expression::Literal(Literal::Number(n)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expression::Literal(Literal::String(s)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Literal(Literal::Null))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LeftBracket => self.parse_sequence(),
            TokenKind::LeftBrace => self.parse_record(),
            TokenKind::Identifier(_) => self.parse_name(),
            TokenKind::Eof => Err(self.error_at("Missing operand", token.start)),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_sequence(&mut self) -> Result<Expression, ScopeError> {
        self.expect(TokenKind::LeftBracket, "'['")?;
        let mut items = Vec::new();

        if self.peek_kind() == &TokenKind::RightBracket {
            self.advance();
            return Ok(Expression::Sequence(items));
        }

        loop {
            items.push(self.parse_or()?);
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightBracket => {
                    self.advance();
                    return Ok(Expression::Sequence(items));
                }
                _ => {
                    let token = self.peek();
                    return Err(self.error_at(
                        format!("Expected ',' or ']', found {}", token.kind.describe()),
                        token.start,
                    ));
                }
            }
        }
    }

    fn parse_record(&mut self) -> Result<Expression, ScopeError> {
        self.expect(TokenKind::LeftBrace, "'{'")?;
        let mut entries = Vec::new();

        if self.peek_kind() == &TokenKind::RightBrace {
            self.advance();
            return Ok(Expression::Record(entries));
        }

        loop {
            let key_token = self.advance();
            let key = match key_token.kind {
                TokenKind::Identifier(name) => name,
                TokenKind::String(s) => s,
                TokenKind::True => "true".to_string(),
                TokenKind::False => "false".to_string(),
                TokenKind::Null => "null".to_string(),
                other => {
                    return Err(self.error_at(
                        format!("Expected record key, found {}", other.describe()),
                        key_token.start,
                    ))
                }
            };
            self.expect(TokenKind::Colon, "':'")?;
            let value = self.parse_or()?;
            entries.push((key, value));

            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightBrace => {
                    self.advance();
                    return Ok(Expression::Record(entries));
                }
                _ => {
                    let token = self.peek();
                    return Err(self.error_at(
                        format!("Expected ',' or '}}', found {}", token.kind.describe()),
                        token.start,
                    ));
                }
            }
        }
    }

    /// Dotted name followed by `(args)` and an optional chain, or a bare word
    fn parse_name(&mut self) -> Result<Expression, ScopeError> {
        let first = self.advance();
        let start = first.start;
        let TokenKind::Identifier(mut name) = first.kind else {
            return Err(self.error_at("Expected command name", start));
        };

        while self.peek_kind() == &TokenKind::Dot {
            match &self.peek_at(1).kind {
                TokenKind::Identifier(part) => {
                    name.push('.');
                    name.push_str(part);
                    self.advance();
                    self.advance();
                }
                _ => {
                    let token = self.peek_at(1).clone();
                    return Err(self.error_at(
                        format!("Expected name after '.', found {}", token.kind.describe()),
                        token.start,
                    ));
                }
            }
        }

        if self.peek_kind() != &TokenKind::LeftParen {
            if self.argument_depth > 0 {
                return Ok(Expression::Literal(Literal::String(name)));
            }
            return Err(self.error_at(
                format!("Expected '(' after command name '{}'", name),
                start,
            ));
        }

        let args = self.parse_arguments()?;
        let chain = self.parse_chain()?;

        if !chain.is_empty() && Operator::from_name(&name).is_some() {
            return Err(self.error_at(
                format!("Operator '{}' cannot be followed by a chain", name),
                start,
            ));
        }

        Ok(Expression::Invocation(Invocation {
            name,
            args,
            negated: false,
            chain,
        }))
    }

    /// `( expr, expr, ... )`
    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ScopeError> {
        let open = self.expect(TokenKind::LeftParen, "'('")?;
        let mut args = Vec::new();

        if self.peek_kind() == &TokenKind::RightParen {
            self.advance();
            return Ok(args);
        }

        self.argument_depth += 1;
        let result = loop {
            let arg = match self.parse_or() {
                Ok(arg) => arg,
                Err(e) => break Err(e),
            };
            args.push(arg);

            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightParen => {
                    self.advance();
                    break Ok(args);
                }
                TokenKind::Eof => {
                    let token = self.peek();
                    break Err(self.error_at("Expected ')' to close argument list", token.start));
                }
                other => {
                    let found = other.describe();
                    let arguments = self.argument_text(open.end);
                    break Err(ScopeError::argument_parse(
                        arguments,
                        format!("Expected ',' or ')', found {}", found),
                    ));
                }
            }
        };
        self.argument_depth -= 1;
        result
    }

    /// Source text of an argument list from just after `(` up to the
    /// matching `)` or the end of input
    fn argument_text(&self, from: usize) -> String {
        let rest = &self.source[from..];
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        for (i, c) in rest.char_indices() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '"' | '\'' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' if depth > 0 => depth -= 1,
                ')' => return rest[..i].trim().to_string(),
                _ => {}
            }
        }
        rest.trim().to_string()
    }

    /// `.property` and `.method(args)` steps, left to right
    fn parse_chain(&mut self) -> Result<Vec<ChainStep>, ScopeError> {
        let mut chain = Vec::new();

        while self.peek_kind() == &TokenKind::Dot {
            self.advance();
            let token = self.advance();
            let key = match token.kind {
                TokenKind::Identifier(key) => key,
                other => {
                    return Err(self.error_at(
                        format!("Expected member name after '.', found {}", other.describe()),
                        token.start,
                    ))
                }
            };

            if self.peek_kind() == &TokenKind::LeftParen {
                let args = self.parse_arguments()?;
                chain.push(ChainStep::Method { name: key, args });
            } else {
                chain.push(ChainStep::Property(key));
            }
        }

        Ok(chain)
    }
}

fn combine(op: Operator, mut operands: Vec<Expression>) -> Expression {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        Expression::Invocation(Invocation::operator(op, operands))
    }
}
