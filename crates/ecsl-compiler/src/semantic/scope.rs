use std::collections::HashMap;

use ecsl_common::Span;

/// How an entity binding was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `ent NAME;`
    Entity,
    /// The iterator of an enclosing `foreach`.
    Iterator,
}

impl BindingKind {
    pub fn describe(self) -> &'static str {
        match self {
            BindingKind::Entity => "entity",
            BindingKind::Iterator => "iterator",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub kind: BindingKind,
    pub defined_at: Span,
}

/// What opened a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Function,
    Foreach,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    bindings: HashMap<String, Binding>,
    parent: Option<usize>,
}

/// Entity bindings visible at the current parse position.
///
/// Scopes live in a flat `Vec` linked by parent indices; `push` opens a child
/// of the current scope and `pop` returns to its parent. Popped scopes are
/// discarded since nothing refers back to them.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
    current: Option<usize>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ScopeKind) {
        let idx = self.scopes.len();
        self.scopes.push(Scope {
            kind,
            bindings: HashMap::new(),
            parent: self.current,
        });
        self.current = Some(idx);
    }

    pub fn pop(&mut self) {
        if let Some(idx) = self.current {
            let scope = &self.scopes[idx];
            tracing::trace!(
                kind = ?scope.kind,
                bindings = scope.bindings.len(),
                "closed scope"
            );
            self.current = scope.parent;
            self.scopes.truncate(idx);
        }
    }

    /// Declare `name` in the innermost scope.
    ///
    /// Returns the earlier binding when the name is already declared in
    /// that same scope; shadowing an outer scope is allowed.
    pub fn declare(&mut self, name: &str, binding: Binding) -> Result<(), Binding> {
        let Some(idx) = self.current else {
            return Ok(());
        };
        let bindings = &mut self.scopes[idx].bindings;
        if let Some(existing) = bindings.get(name) {
            return Err(existing.clone());
        }
        bindings.insert(name.to_string(), binding);
        Ok(())
    }

    /// Find `name` in the current scope or any enclosing one.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        let mut cursor = self.current;
        while let Some(idx) = cursor {
            let scope = &self.scopes[idx];
            if let Some(binding) = scope.bindings.get(name) {
                return Some(binding);
            }
            cursor = scope.parent;
        }
        None
    }
}
