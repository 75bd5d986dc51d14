pub mod errors;
pub mod ir;
pub mod manifest;
pub mod span;

pub use errors::{CompileError, Diagnostic, DiagnosticBag, ErrorKind, Severity};
pub use ir::{Definition, IrModule};
pub use span::{Position, Span};
