//! C runtime generation.
//!
//! Four passes run in a fixed order over the validated program and their
//! output is concatenated: prologue (storage), types (layouts and
//! destructors), runtime (entity lifecycle and component accessors) and
//! statements (translated function bodies).

mod component_table;
mod prologue;
mod runtime;
mod statements;
mod types;
mod writer;

use std::fmt;
use std::str::FromStr;

use ecsl_common::CompileError;

use crate::ast::Program;

pub use component_table::ComponentTable;

pub const DEFAULT_MAX_ENTITY_COUNT: usize = 1024;

/// Member types whose destruction is a no-op.
pub const DEFAULT_PRIMITIVES: &[&str] = &[
    "int", "float", "double", "char", "bool", "short", "long", "unsigned", "size_t", "uint8_t",
    "uint16_t", "uint32_t", "uint64_t", "int8_t", "int16_t", "int32_t", "int64_t",
];

/// How a foreach filter combines its component existence checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Visit entities owning every listed component.
    #[default]
    All,
    /// Visit entities owning at least one listed component.
    Any,
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(FilterMode::All),
            "any" => Ok(FilterMode::Any),
            other => Err(format!(
                "unknown foreach filter '{}' (expected 'all' or 'any')",
                other
            )),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::All => write!(f, "all"),
            FilterMode::Any => write!(f, "any"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CodegenOptions {
    pub max_entity_count: usize,
    pub filter_mode: FilterMode,
    pub primitives: Vec<String>,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            max_entity_count: DEFAULT_MAX_ENTITY_COUNT,
            filter_mode: FilterMode::All,
            primitives: DEFAULT_PRIMITIVES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl CodegenOptions {
    /// Append extra primitive type names, skipping ones already known.
    pub fn add_primitives<I, S>(&mut self, extra: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in extra {
            let name = name.into();
            if !self.primitives.contains(&name) {
                self.primitives.push(name);
            }
        }
    }

    pub fn is_primitive(&self, type_name: &str) -> bool {
        self.primitives.iter().any(|p| p == type_name)
    }
}

/// State shared by every pass: the program, the options and the component ids.
pub(crate) struct GenContext<'a> {
    pub program: &'a Program,
    pub options: &'a CodegenOptions,
    pub components: ComponentTable,
}

/// Lowers a validated program to C source text.
pub struct CodeGenerator {
    options: CodegenOptions,
}

impl CodeGenerator {
    pub fn new(options: CodegenOptions) -> Self {
        Self { options }
    }

    /// Run the four passes and concatenate their output.
    pub fn generate(&self, program: &Program) -> Result<String, CompileError> {
        let ctx = GenContext {
            program,
            options: &self.options,
            components: ComponentTable::from_program(program),
        };

        let passes: [(&str, fn(&GenContext) -> Result<String, CompileError>); 4] = [
            ("prologue", prologue::render),
            ("types", types::render),
            ("runtime", runtime::render),
            ("statements", statements::render),
        ];

        let mut output = String::new();
        for (name, pass) in passes {
            let text = pass(&ctx)?;
            tracing::debug!(pass = name, bytes = text.len(), "codegen pass finished");
            output.push_str(&text);
        }
        Ok(output)
    }
}
