use ecsl_common::CompileError;

use crate::ast::*;
use crate::lexer::token::TokenKind;
use crate::semantic::names::{self, NameUse};
use crate::semantic::scope::{Binding, BindingKind, ScopeKind};

use super::{ParseResult, Parser};

impl Parser {
    /// Parse `{ STATEMENT* }` as a new scope.
    ///
    /// `iterator` is declared inside the new scope before the body is read;
    /// nested foreach bodies re-enter this routine.
    pub(super) fn parse_block(
        &mut self,
        kind: ScopeKind,
        iterator: Option<&Ident>,
    ) -> ParseResult<Block> {
        let open = self.expect(TokenKind::LeftBrace)?;
        self.scopes.push(kind);
        if let Some(iterator) = iterator {
            self.declare_binding(iterator, BindingKind::Iterator)?;
        }

        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                TokenKind::RightBrace => break,
                TokenKind::Eof => {
                    return Err(CompileError::structural(
                        "missing '}' to close this block",
                        Some(open.span),
                    ))
                }
                _ => stmts.push(self.parse_statement()?),
            }
        }
        self.advance(); // consume '}'
        self.scopes.pop();

        Ok(Block {
            stmts,
            span: open.span.merge(&self.previous_span()),
        })
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.peek() {
            TokenKind::Ent => self.parse_create_entity(),
            TokenKind::Foreach => self.parse_foreach(),
            TokenKind::Identifier => self.parse_method_call(),
            _ => Err(self.unexpected("statement or '}'")),
        }
    }

    /// Parse `ent NAME;`
    fn parse_create_entity(&mut self) -> ParseResult<Stmt> {
        self.advance(); // consume 'ent'
        let name = self.expect_ident("entity name")?;
        self.expect(TokenKind::Semicolon)?;
        self.declare_binding(&name, BindingKind::Entity)?;
        Ok(Stmt::CreateEntity(name))
    }

    /// Parse `foreach NAME [COMPONENT…] { … }`
    fn parse_foreach(&mut self) -> ParseResult<Stmt> {
        self.advance(); // consume 'foreach'
        let iterator = self.expect_ident("iterator name")?;

        let mut filter = Vec::new();
        while self.peek() == TokenKind::Identifier {
            filter.push(self.expect_ident("component name")?);
        }
        if self.peek() != TokenKind::LeftBrace {
            return Err(self.unexpected("component name or '{'"));
        }

        let body = self.parse_block(ScopeKind::Foreach, Some(&iterator))?;
        Ok(Stmt::Foreach(ForeachStmt {
            iterator,
            filter,
            body,
        }))
    }

    /// Parse `NAME.add<C1, C2>();` or `NAME.destroy();`
    fn parse_method_call(&mut self) -> ParseResult<Stmt> {
        let binding = self.expect_ident("entity name")?;
        if self.scopes.lookup(&binding.name).is_none() {
            return Err(CompileError::unknown(
                "entity",
                binding.name,
                Some(binding.span),
            ));
        }
        self.expect(TokenKind::Dot)?;

        let is_add = self
            .current()
            .is_some_and(|t| t.kind == TokenKind::Identifier && t.lexeme == "add");
        if is_add {
            self.expect_word("add")?;
            let components = self.parse_component_list()?;
            self.expect(TokenKind::LeftParen)?;
            self.expect(TokenKind::RightParen)?;
            self.expect(TokenKind::Semicolon)?;
            return Ok(Stmt::AddComponents {
                binding,
                components,
            });
        }

        let is_destroy = self
            .current()
            .is_some_and(|t| t.kind == TokenKind::Identifier && t.lexeme == "destroy");
        if !is_destroy {
            return Err(self.unexpected("'add' or 'destroy'"));
        }
        self.expect_word("destroy")?;
        self.expect(TokenKind::LeftParen)?;
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::DestroyEntity(binding))
    }

    /// Parse `< NAME (, NAME)* >`
    fn parse_component_list(&mut self) -> ParseResult<Vec<Ident>> {
        self.expect(TokenKind::Less)?;
        let mut components = vec![self.expect_ident("component name")?];
        while self.eat(TokenKind::Comma) {
            components.push(self.expect_ident("component name")?);
        }
        self.expect_described(TokenKind::Greater, "',' or '>'")?;
        Ok(components)
    }

    fn declare_binding(&mut self, name: &Ident, kind: BindingKind) -> ParseResult<()> {
        names::check(name, NameUse::Local)?;
        let binding = Binding {
            kind,
            defined_at: name.span.clone(),
        };
        self.scopes
            .declare(&name.name, binding)
            .map_err(|existing| {
                CompileError::duplicate(
                    existing.kind.describe(),
                    &name.name,
                    name.span.clone(),
                    existing.defined_at,
                )
            })
    }
}
