use ecsl_common::CompileError;

use super::writer::CodeWriter;
use super::GenContext;

/// World allocation, entity lifecycle and per-component `add_`/`get_` accessors.
///
/// Parameters and locals use the `ecs` name or the `ecs_` prefix, which user
/// declarations cannot take, so no user type can shadow them.
pub(super) fn render(ctx: &GenContext) -> Result<String, CompileError> {
    let mut w = CodeWriter::new();
    render_world_create(&mut w);
    render_create(&mut w);
    render_destroy_entity(ctx, &mut w);
    render_cleanup(&mut w);
    render_world_destroy(&mut w);
    for (id, name) in ctx.components.iter() {
        render_add(&mut w, id, name);
        render_get(&mut w, id, name);
    }
    Ok(w.finish())
}

fn render_world_create(w: &mut CodeWriter) {
    w.open("ecs_world* world_create(void)");
    w.line("ecs_world* ecs = (ecs_world*)calloc(1, sizeof(ecs_world));");
    w.open("if (ecs == NULL)");
    w.line("abort();");
    w.close();
    w.line("return ecs;");
    w.close();
    w.blank();
}

/// Reuse the most recently freed id, otherwise advance the counter.
fn render_create(w: &mut CodeWriter) {
    w.open("entity_id create(ecs_world* ecs)");
    w.line("entity_id ecs_entity;");
    w.open("if (ecs->free_id_count == 0)");
    w.open("if (ecs->max_id >= MAX_ENTITY_COUNT)");
    w.line("abort();");
    w.close();
    w.line("ecs_entity = ecs->max_id++;");
    w.reopen("else");
    w.line("--ecs->free_id_count;");
    w.line("ecs_entity = ecs->free_ids[ecs->free_id_count];");
    w.close();
    w.line("ecs->alive[ecs_entity] = 1;");
    w.line("return ecs_entity;");
    w.close();
    w.blank();
}

fn render_destroy_entity(ctx: &GenContext, w: &mut CodeWriter) {
    w.open("void destroy_entity(ecs_world* ecs, const entity_id ecs_entity)");
    w.open("if (!ecs->alive[ecs_entity])");
    w.line("return;");
    w.close();
    w.open("for (size_t ecs_i = 0u; ecs_i < COMPONENT_COUNT; ++ecs_i)");
    w.line("component_info* ecs_info = &ecs->components[ecs_i][ecs_entity];");
    w.open("if (!ecs_info->exist)");
    w.line("continue;");
    w.close();
    w.line("ecs_info->exist = 0;");
    w.open("switch (ecs_i)");
    for (id, name) in ctx.components.iter() {
        w.line(format!("case {}:", id));
        w.line(format!("\t{}_destroy(({}*)ecs_info->data);", name, name));
        w.line("\tbreak;");
    }
    w.line("default:");
    w.line("\tbreak;");
    w.close();
    w.close();
    w.line("ecs->alive[ecs_entity] = 0;");
    w.line("ecs->free_ids[ecs->free_id_count] = ecs_entity;");
    w.line("++ecs->free_id_count;");
    w.close();
    w.blank();
}

/// Payload storage is kept across destroy/create and only released here.
fn render_cleanup(w: &mut CodeWriter) {
    w.open("void cleanup(ecs_world* ecs)");
    w.open("for (size_t ecs_i = 0u; ecs_i < COMPONENT_COUNT; ++ecs_i)");
    w.open("for (entity_id ecs_j = 0u; ecs_j < ecs->max_id; ++ecs_j)");
    w.line("component_info* ecs_info = &ecs->components[ecs_i][ecs_j];");
    w.open("if (ecs_info->data != NULL)");
    w.line("free(ecs_info->data);");
    w.line("ecs_info->data = NULL;");
    w.line("ecs_info->data_size = 0u;");
    w.line("ecs_info->exist = 0;");
    w.close();
    w.close();
    w.close();
    w.close();
    w.blank();
}

fn render_world_destroy(w: &mut CodeWriter) {
    w.open("void world_destroy(ecs_world* ecs)");
    w.line("cleanup(ecs);");
    w.line("free(ecs);");
    w.close();
    w.blank();
}

/// Lazily allocate a word-aligned payload, then zero it. Re-adding resets the value.
fn render_add(w: &mut CodeWriter, id: usize, name: &str) {
    w.open(format!(
        "void add_{}(ecs_world* ecs, const entity_id ecs_entity)",
        name
    ));
    w.line(format!(
        "component_info* ecs_info = &ecs->components[{}][ecs_entity];",
        id
    ));
    w.line(format!(
        "const size_t ecs_size = ((sizeof({}) + sizeof(size_t) - 1u) / sizeof(size_t)) * sizeof(size_t);",
        name
    ));
    w.open("if (ecs_info->exist)");
    w.line(format!("{}_destroy(({}*)ecs_info->data);", name, name));
    w.close();
    w.open("if (ecs_info->data == NULL)");
    w.line("ecs_info->data = (size_t*)malloc(ecs_size);");
    w.open("if (ecs_info->data == NULL)");
    w.line("abort();");
    w.close();
    w.line("ecs_info->data_size = ecs_size;");
    w.close();
    w.line("memset(ecs_info->data, 0, ecs_size);");
    w.line("ecs_info->exist = 1;");
    w.close();
    w.blank();
    tracing::trace!(component = name, id, "emitted add accessor");
}

fn render_get(w: &mut CodeWriter, id: usize, name: &str) {
    w.open(format!(
        "{}* get_{}(ecs_world* ecs, const entity_id ecs_entity)",
        name, name
    ));
    w.line(format!(
        "component_info* ecs_info = &ecs->components[{}][ecs_entity];",
        id
    ));
    w.line(format!(
        "return ecs_info->exist ? ({}*)ecs_info->data : NULL;",
        name
    ));
    w.close();
    w.blank();
}

#[cfg(test)]
mod tests {
    use crate::codegen::CodegenOptions;
    use crate::compile;

    fn generate(source: &str) -> String {
        compile(source, "test.ecs", &CodegenOptions::default())
            .unwrap_or_else(|e| panic!("compile failed: {}", e))
            .output
    }

    /// Text between `header {` and the matching closing brace at column 0.
    fn body<'a>(output: &'a str, header: &str) -> &'a str {
        let open = format!("{} {{\n", header);
        let start = output
            .find(&open)
            .unwrap_or_else(|| panic!("missing '{}'", header))
            + open.len();
        let end = start + output[start..].find("\n}\n").unwrap();
        &output[start..end]
    }

    fn before(haystack: &str, first: &str, second: &str) -> bool {
        match (haystack.find(first), haystack.find(second)) {
            (Some(a), Some(b)) => a < b,
            _ => panic!("missing '{}' or '{}' in:\n{}", first, second, haystack),
        }
    }

    const TWO_COMPONENTS: &str = "struct point { float x; float y; };
        component position { point vector; };
        component velocity { point vector; };
        ~int main() { ent e; e.add<position, velocity>(); }";

    #[test]
    fn accessors_use_component_ids() {
        let out = generate(TWO_COMPONENTS);
        assert!(out.contains("void add_position(ecs_world* ecs, const entity_id ecs_entity) {"));
        assert!(out.contains("\tcomponent_info* ecs_info = &ecs->components[1][ecs_entity];\n\tconst size_t ecs_size = ((sizeof(velocity)"));
        assert!(out.contains("position* get_position(ecs_world* ecs, const entity_id ecs_entity) {"));
        assert!(out.contains("return ecs_info->exist ? (velocity*)ecs_info->data : NULL;"));
    }

    #[test]
    fn destroy_entity_dispatches_every_component() {
        let out = generate(TWO_COMPONENTS);
        assert!(out.contains("\t\t\tcase 0:\n\t\t\t\tposition_destroy((position*)ecs_info->data);\n\t\t\t\tbreak;\n"));
        assert!(out.contains("\t\t\tcase 1:\n\t\t\t\tvelocity_destroy((velocity*)ecs_info->data);\n\t\t\t\tbreak;\n"));
        assert!(!out.contains("point_destroy((point*)ecs_info->data)"));
    }

    #[test]
    fn create_pops_free_list_before_advancing() {
        let out = generate(TWO_COMPONENTS);
        let create = body(&out, "entity_id create(ecs_world* ecs)");
        assert!(before(create, "if (ecs->free_id_count == 0) {", "ecs_entity = ecs->max_id++;"));
        assert!(before(
            create,
            "ecs_entity = ecs->max_id++;",
            "ecs_entity = ecs->free_ids[ecs->free_id_count];"
        ));
    }

    #[test]
    fn create_aborts_when_ids_run_out() {
        let out = generate(TWO_COMPONENTS);
        let create = body(&out, "entity_id create(ecs_world* ecs)");
        assert!(create.contains(
            "\t\tif (ecs->max_id >= MAX_ENTITY_COUNT) {\n\t\t\tabort();\n\t\t}\n\t\tecs_entity = ecs->max_id++;"
        ));
    }

    #[test]
    fn destroy_entity_ignores_dead_handles() {
        let out = generate(TWO_COMPONENTS);
        let destroy = body(&out, "void destroy_entity(ecs_world* ecs, const entity_id ecs_entity)");
        assert!(destroy.starts_with("\tif (!ecs->alive[ecs_entity]) {\n\t\treturn;\n\t}\n"));
        assert!(before(destroy, "return;", "ecs->free_ids[ecs->free_id_count] = ecs_entity;"));
    }

    #[test]
    fn destroy_entity_keeps_payload_storage() {
        let out = generate(TWO_COMPONENTS);
        let destroy = body(&out, "void destroy_entity(ecs_world* ecs, const entity_id ecs_entity)");
        assert!(!destroy.contains("free("));
        assert!(!destroy.contains("->data = NULL"));

        let cleanup = body(&out, "void cleanup(ecs_world* ecs)");
        assert!(cleanup.contains("free(ecs_info->data);\n\t\t\t\tecs_info->data = NULL;"));
        assert!(body(&out, "void world_destroy(ecs_world* ecs)").starts_with("\tcleanup(ecs);\n"));
    }

    #[test]
    fn re_add_destroys_old_value_then_zeroes() {
        let out = generate(TWO_COMPONENTS);
        let add = body(&out, "void add_position(ecs_world* ecs, const entity_id ecs_entity)");
        assert!(add.contains("\tif (ecs_info->exist) {\n\t\tposition_destroy((position*)ecs_info->data);\n\t}\n"));
        assert!(before(add, "position_destroy(", "memset(ecs_info->data, 0, ecs_size);"));
        // Allocation happens only for missing storage; an existing buffer is reused.
        assert!(add.contains("\tif (ecs_info->data == NULL) {\n\t\tecs_info->data = (size_t*)malloc(ecs_size);"));
        assert!(before(add, "memset(", "ecs_info->exist = 1;"));
    }

    #[test]
    fn lifecycle_functions_precede_accessors() {
        let out = generate(TWO_COMPONENTS);
        let order = [
            "ecs_world* world_create(void)",
            "entity_id create(ecs_world* ecs)",
            "void destroy_entity(ecs_world* ecs, const entity_id ecs_entity)",
            "void cleanup(ecs_world* ecs)",
            "void world_destroy(ecs_world* ecs)",
            "void add_position(",
            "position* get_position(",
            "void add_velocity(",
            "velocity* get_velocity(",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|needle| out.find(needle).unwrap_or_else(|| panic!("missing {}", needle)))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);
    }

    #[test]
    fn component_names_cannot_shadow_runtime_locals() {
        let out = generate(
            "struct big { int b; }; component entity { big b; }; component info { int i; };
             ~int main() { ent e; e.add<entity, info>(); }",
        );
        assert!(out.contains("sizeof(entity)"));
        assert!(out.contains("entity_destroy((entity*)ecs_info->data);"));
        assert!(out.contains("info_destroy((info*)ecs_info->data);"));
        assert!(!out.contains("component_info* info "));
    }

    #[test]
    fn no_components_still_emits_runtime() {
        let out = generate("~int main() { ent e; e.destroy(); }");
        assert!(out.contains("#define COMPONENT_COUNT 0"));
        assert!(out.contains("\t\t\tdefault:\n\t\t\t\tbreak;\n"));
        assert!(!out.contains("add_"));
    }
}
