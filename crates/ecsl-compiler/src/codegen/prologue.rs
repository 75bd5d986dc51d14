use ecsl_common::CompileError;

use super::writer::CodeWriter;
use super::GenContext;

/// Includes, capacity macros and the world storage layout.
pub(super) fn render(ctx: &GenContext) -> Result<String, CompileError> {
    let mut w = CodeWriter::new();

    w.line("/* Generated by ecslc. Do not edit. */");
    w.line("#include <stdbool.h>");
    w.line("#include <stddef.h>");
    w.line("#include <stdint.h>");
    w.line("#include <stdlib.h>");
    w.line("#include <string.h>");
    w.blank();
    w.line(format!("#define COMPONENT_COUNT {}", ctx.components.len()));
    w.line(format!("#define MAX_ENTITY_COUNT {}", ctx.options.max_entity_count));
    w.blank();
    w.line("typedef size_t entity_id;");
    w.blank();

    w.open("typedef struct component_info");
    w.line("int exist;");
    w.line("size_t* data;");
    w.line("size_t data_size;");
    w.close_with(" component_info;");
    w.blank();

    // A zero-length array is not valid C, so an empty program keeps one row.
    w.open("typedef struct ecs_world");
    w.line("component_info components[COMPONENT_COUNT > 0 ? COMPONENT_COUNT : 1][MAX_ENTITY_COUNT];");
    w.line("int alive[MAX_ENTITY_COUNT];");
    w.line("entity_id max_id;");
    w.line("entity_id free_ids[MAX_ENTITY_COUNT];");
    w.line("size_t free_id_count;");
    w.close_with(" ecs_world;");
    w.blank();

    Ok(w.finish())
}

#[cfg(test)]
mod tests {
    use crate::codegen::{CodeGenerator, CodegenOptions};
    use crate::parse_source;

    fn prologue(source: &str) -> String {
        let program = parse_source(source, "test.ecs").unwrap();
        let out = CodeGenerator::new(CodegenOptions::default())
            .generate(&program)
            .unwrap();
        let end = out.find("} ecs_world;").expect("world layout");
        out[..end].to_string()
    }

    #[test]
    fn headers_cover_default_primitives() {
        let out = prologue("component flags { bool on; uint8_t mask; int64_t big; };");
        for header in ["<stdbool.h>", "<stddef.h>", "<stdint.h>", "<stdlib.h>", "<string.h>"] {
            assert!(out.contains(&format!("#include {}\n", header)), "{}", header);
        }
    }

    #[test]
    fn empty_program_keeps_one_component_row() {
        let out = prologue("");
        assert!(out.contains("#define COMPONENT_COUNT 0\n"));
        assert!(out.contains("component_info components[COMPONENT_COUNT > 0 ? COMPONENT_COUNT : 1][MAX_ENTITY_COUNT];"));
    }
}
