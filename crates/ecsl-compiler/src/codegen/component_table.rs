use std::collections::HashMap;

use ecsl_common::{CompileError, Span};

use crate::ast::Program;

/// Component name → dense runtime id, fixed once parsing completes.
#[derive(Debug, Clone, Default)]
pub struct ComponentTable {
    names: Vec<String>,
    ids: HashMap<String, usize>,
}

impl ComponentTable {
    pub fn from_program(program: &Program) -> Self {
        let mut table = Self::default();
        for component in program.components() {
            table.insert(&component.name.name);
        }
        table
    }

    /// Register `name`, returning its id. Re-registering returns the first id.
    pub fn insert(&mut self, name: &str) -> usize {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Id of a component referenced from a statement.
    pub fn resolve(&self, name: &str, span: &Span) -> Result<usize, CompileError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::unknown("component", name, Some(span.clone())))
    }

    /// `(id, name)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(String::as_str).enumerate()
    }
}
