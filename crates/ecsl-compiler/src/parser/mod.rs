mod declarations;
mod statements;

use ecsl_common::{CompileError, Span};

use crate::ast::*;
use crate::lexer::token::{Token, TokenKind};
use crate::semantic::scope::ScopeStack;

pub type ParseResult<T> = Result<T, CompileError>;

/// Single-pass recursive descent parser for the ecsl DSL.
///
/// Stops at the first token that does not fit the grammar. Entity bindings
/// are checked while parsing, so a successful parse implies every `add` and
/// `destroy` refers to a declared handle.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    scopes: ScopeStack,
    next_component_id: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            scopes: ScopeStack::new(),
            next_component_id: 0,
        }
    }

    /// Parse the entire token stream into a Program.
    pub fn parse(mut self) -> ParseResult<Program> {
        let start = self.current_span();
        let mut items = Vec::new();

        while !self.is_at_end() {
            items.push(self.parse_item()?);
        }

        let span = start.merge(&self.current_span());
        tracing::debug!(
            items = items.len(),
            components = self.next_component_id,
            "parsed program"
        );
        Ok(Program { items, span })
    }

    // ========================================================================
    // Token manipulation helpers
    // ========================================================================

    fn peek(&self) -> TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    /// Current token; past the end this is the final (`Eof`) token.
    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos).or_else(|| self.tokens.last())
    }

    fn previous(&self) -> Option<&Token> {
        self.pos.checked_sub(1).and_then(|idx| self.tokens.get(idx))
    }

    fn advance(&mut self) -> Option<&Token> {
        if !self.is_at_end() {
            self.pos += 1;
        }
        self.previous()
    }

    /// Consume a token of the expected kind or fail with `LexicalMismatch`.
    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        self.expect_described(kind, kind.describe())
    }

    fn expect_described(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.peek() == kind {
            let token = self.current().cloned().ok_or_else(|| self.unexpected(expected))?;
            self.advance();
            Ok(token)
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Consume an identifier and return it with its span.
    fn expect_ident(&mut self, what: &str) -> ParseResult<Ident> {
        let token = self.expect_described(TokenKind::Identifier, what)?;
        Ok(Ident::new(token.lexeme, token.span))
    }

    /// Consume an identifier whose text must be exactly `word`.
    fn expect_word(&mut self, word: &str) -> ParseResult<Ident> {
        let expected = format!("'{}'", word);
        let found = matches!(
            self.current(),
            Some(token) if token.kind == TokenKind::Identifier && token.lexeme == word
        );
        if found {
            self.expect_ident(&expected)
        } else {
            Err(self.unexpected(&expected))
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek() == TokenKind::Eof
    }

    fn current_span(&self) -> Span {
        self.current()
            .map(|t| t.span.clone())
            .unwrap_or_else(Span::dummy)
    }

    fn previous_span(&self) -> Span {
        self.previous()
            .map(|t| t.span.clone())
            .unwrap_or_else(|| self.current_span())
    }

    /// Build a `LexicalMismatch` for the current token.
    fn unexpected(&self, expected: &str) -> CompileError {
        let found = self
            .current()
            .map(Token::describe)
            .unwrap_or_else(|| "end of input".to_string());
        CompileError::lexical(expected, found, self.current_span())
    }
}
