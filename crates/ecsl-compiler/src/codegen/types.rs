use ecsl_common::CompileError;

use crate::ast::AggregateDecl;

use super::writer::CodeWriter;
use super::GenContext;

/// Layout and destructor for every struct and component, in declaration order.
pub(super) fn render(ctx: &GenContext) -> Result<String, CompileError> {
    let mut w = CodeWriter::new();
    for decl in ctx.program.aggregates() {
        render_layout(&mut w, decl);
        render_destructor(ctx, &mut w, decl)?;
    }
    Ok(w.finish())
}

fn render_layout(w: &mut CodeWriter, decl: &AggregateDecl) {
    let name = &decl.name.name;
    w.open(format!("typedef struct {}", name));
    if decl.members.is_empty() {
        w.line("char unused;");
    }
    for member in &decl.members {
        w.line(format!("{} {};", member.type_name.name, member.name.name));
    }
    w.close_with(&format!(" {};", name));
    w.blank();
}

/// Destroys aggregate members in declaration order; primitive members need nothing.
fn render_destructor(
    ctx: &GenContext,
    w: &mut CodeWriter,
    decl: &AggregateDecl,
) -> Result<(), CompileError> {
    let name = &decl.name.name;
    w.open(format!("void {}_destroy({}* ecs_self)", name, name));
    w.line("(void)ecs_self;");
    for member in &decl.members {
        let type_name = &member.type_name.name;
        if ctx.options.is_primitive(type_name) {
            continue;
        }
        if ctx.program.aggregate(type_name).is_none() {
            return Err(CompileError::unknown(
                "type",
                type_name,
                Some(member.type_name.span.clone()),
            ));
        }
        w.line(format!("{}_destroy(&ecs_self->{});", type_name, member.name.name));
    }
    w.close();
    w.blank();
    tracing::trace!(aggregate = %name, "emitted layout and destructor");
    Ok(())
}
