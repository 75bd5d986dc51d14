use ecsl_common::CompileError;

use crate::ast::*;
use crate::lexer::token::TokenKind;
use crate::semantic::scope::ScopeKind;

use super::{ParseResult, Parser};

impl Parser {
    /// Parse one top-level declaration.
    pub(super) fn parse_item(&mut self) -> ParseResult<Item> {
        match self.peek() {
            TokenKind::Struct => Ok(Item::Struct(self.parse_aggregate(false)?)),
            TokenKind::Component => Ok(Item::Component(self.parse_aggregate(true)?)),
            TokenKind::Tilde => Ok(Item::Function(self.parse_function()?)),
            _ => Err(self.unexpected("'struct', 'component' or '~'")),
        }
    }

    /// Parse `struct NAME { (TYPE NAME ;)* };` or the `component` equivalent.
    fn parse_aggregate(&mut self, is_component: bool) -> ParseResult<AggregateDecl> {
        let start = self.current_span();
        self.advance(); // consume 'struct' / 'component'

        let name = self.expect_ident(if is_component {
            "component name"
        } else {
            "struct name"
        })?;
        let component_id = is_component.then(|| {
            let id = self.next_component_id;
            self.next_component_id += 1;
            id
        });

        let open = self.expect(TokenKind::LeftBrace)?;
        let mut members = Vec::new();
        loop {
            match self.peek() {
                TokenKind::RightBrace => break,
                TokenKind::Eof => {
                    return Err(CompileError::structural(
                        format!("missing '}}' to close the body of '{}'", name.name),
                        Some(open.span),
                    ))
                }
                _ => members.push(self.parse_member()?),
            }
        }
        self.advance(); // consume '}'
        self.expect(TokenKind::Semicolon)?;

        let span = start.merge(&self.previous_span());
        tracing::trace!(
            name = %name.name,
            component_id = ?component_id,
            members = members.len(),
            "parsed aggregate"
        );
        Ok(AggregateDecl {
            name,
            component_id,
            members,
            span,
        })
    }

    /// Parse `TYPE NAME ;`
    fn parse_member(&mut self) -> ParseResult<MemberDecl> {
        let type_name = self.expect_ident("member type or '}'")?;
        let name = self.expect_ident("member name")?;
        self.expect(TokenKind::Semicolon)?;
        Ok(MemberDecl { type_name, name })
    }

    /// Parse `~RET NAME();` or `~RET NAME() { … }`.
    fn parse_function(&mut self) -> ParseResult<FunctionDecl> {
        let start = self.current_span();
        self.advance(); // consume '~'

        let return_type = self.expect_ident("return type")?;
        let name = self.expect_ident("function name")?;
        self.expect(TokenKind::LeftParen)?;
        self.expect_described(TokenKind::RightParen, "')' (functions take no parameters)")?;

        let body = match self.peek() {
            TokenKind::Semicolon => {
                self.advance();
                None
            }
            TokenKind::LeftBrace => Some(self.parse_block(ScopeKind::Function, None)?),
            _ => return Err(self.unexpected("'{' or ';'")),
        };

        let span = start.merge(&self.previous_span());
        Ok(FunctionDecl {
            return_type,
            name,
            body,
            span,
        })
    }
}
