pub mod names;
pub mod scope;
pub mod validator;

use ecsl_common::{CompileError, DiagnosticBag};

use crate::ast::Program;

/// Run whole-program validation.
///
/// Checks, in order: aggregate names and member types, function
/// signatures, clashes between generated C names, and component references
/// from `add`/`foreach`. Returns the accumulated warnings, or the first error.
pub fn analyze(program: &Program, primitives: &[String]) -> Result<DiagnosticBag, CompileError> {
    let diagnostics = validator::Validator::new(primitives).validate(program)?;
    tracing::debug!(
        warnings = diagnostics.diagnostics().len(),
        "semantic analysis finished"
    );
    Ok(diagnostics)
}
