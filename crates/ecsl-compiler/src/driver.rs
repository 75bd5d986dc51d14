use ecsl_common::{CompileError, Diagnostic};

use crate::ast::Program;
use crate::codegen::{CodeGenerator, CodegenOptions};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::semantic;

/// Program compiled when `ecslc` is run without an input file.
pub const SAMPLE_PROGRAM: &str = r#"struct point { float x; float y; };
component position { point vector; };
component velocity { point vector; };

~int main() {
    ent first;
    first.add<position, velocity>();
    foreach e position velocity {
        e.destroy();
    }
}
"#;

/// Result of a successful run through every stage.
#[derive(Debug)]
pub struct Compilation {
    pub program: Program,
    pub output: String,
    pub warnings: Vec<Diagnostic>,
}

impl Compilation {
    /// Pretty JSON of the flat IR.
    pub fn ir_json(&self, module: &str, source_file: &str) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.program.to_ir_module(module, source_file))
    }
}

/// Lex and parse `source`; the first lexer error aborts like a parse error.
pub fn parse_source(source: &str, file: &str) -> Result<Program, CompileError> {
    let (tokens, lex_diags) = Lexer::new(source, file).tokenize();
    if let Some(diag) = lex_diags.first_error() {
        return Err(CompileError::structural(diag.message.clone(), diag.span.clone()));
    }
    Parser::new(tokens).parse()
}

/// Parse, validate and generate. No output is produced unless every stage succeeds.
pub fn compile(
    source: &str,
    file: &str,
    options: &CodegenOptions,
) -> Result<Compilation, CompileError> {
    let program = parse_source(source, file)?;
    let warnings = semantic::analyze(&program, &options.primitives)?;
    let output = CodeGenerator::new(options.clone()).generate(&program)?;
    Ok(Compilation {
        program,
        output,
        warnings: warnings.into_diagnostics(),
    })
}

#[cfg(test)]
mod tests {
    use ecsl_common::ErrorKind;

    use super::*;

    #[test]
    fn sample_program_compiles_cleanly() {
        let compiled = compile(SAMPLE_PROGRAM, "sample.ecs", &CodegenOptions::default())
            .unwrap_or_else(|e| panic!("sample failed: {}", e));
        assert!(compiled.warnings.is_empty(), "{:?}", compiled.warnings);
        assert!(compiled.output.contains("#define COMPONENT_COUNT 2"));
    }

    #[test]
    fn unterminated_comment_aborts() {
        let err = compile("/* never closed", "t.ecs", &CodegenOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralError);
        assert_eq!(err.to_string(), "unterminated block comment");
    }

    #[test]
    fn ir_json_lists_definitions() {
        let compiled = compile(SAMPLE_PROGRAM, "sample.ecs", &CodegenOptions::default()).unwrap();
        let json = compiled.ir_json("sample", "sample.ecs").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["component_count"], 2);
        assert_eq!(value["module"], "sample");
        let defs = value["definitions"].as_array().unwrap();
        assert_eq!(defs.last().unwrap()["kind"], "end_of_program");
        assert_eq!(defs.len(), compiled.program.definitions().len());
    }
}
