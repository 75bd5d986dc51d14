pub mod ast;
pub mod codegen;
pub mod lexer;
pub mod parser;
pub mod semantic;

mod driver;

pub use driver::{compile, parse_source, Compilation, SAMPLE_PROGRAM};
