use ecsl_common::CompileError;

use crate::ast::*;

use super::writer::CodeWriter;
use super::{FilterMode, GenContext};

/// Name of the world handle inside translated function bodies.
const WORLD: &str = "ecs";

/// Translated function prototypes and bodies, in declaration order.
pub(super) fn render(ctx: &GenContext) -> Result<String, CompileError> {
    let mut w = CodeWriter::new();
    for func in ctx.program.functions() {
        render_function(ctx, &mut w, func)?;
    }
    Ok(w.finish())
}

fn is_entry_point(func: &FunctionDecl) -> bool {
    func.name.name == "main"
}

/// `main` is always `int main(void)`, whatever the source wrote.
fn signature(func: &FunctionDecl) -> String {
    if is_entry_point(func) {
        "int main(void)".to_string()
    } else {
        format!(
            "{} {}(ecs_world* {})",
            func.return_type.name, func.name.name, WORLD
        )
    }
}

/// `main` owns the world; every other function borrows it as a parameter.
fn render_function(
    ctx: &GenContext,
    w: &mut CodeWriter,
    func: &FunctionDecl,
) -> Result<(), CompileError> {
    let Some(body) = &func.body else {
        w.line(format!("{};", signature(func)));
        w.blank();
        return Ok(());
    };

    w.open(signature(func));
    if is_entry_point(func) {
        w.line(format!("ecs_world* {} = world_create();", WORLD));
    }
    render_block(ctx, w, body)?;
    if is_entry_point(func) {
        w.line("// program exit");
        w.line(format!("world_destroy({});", WORLD));
        w.line("return 0;");
    }
    w.close();
    w.blank();
    Ok(())
}

fn render_block(ctx: &GenContext, w: &mut CodeWriter, block: &Block) -> Result<(), CompileError> {
    for stmt in &block.stmts {
        render_stmt(ctx, w, stmt)?;
    }
    Ok(())
}

fn render_stmt(ctx: &GenContext, w: &mut CodeWriter, stmt: &Stmt) -> Result<(), CompileError> {
    match stmt {
        Stmt::CreateEntity(binding) => {
            w.line(format!("// ent {}", binding.name));
            w.line(format!(
                "const entity_id {} = create({});",
                binding.name, WORLD
            ));
        }
        Stmt::AddComponents {
            binding,
            components,
        } => {
            let names: Vec<&str> = components.iter().map(|c| c.name.as_str()).collect();
            w.line(format!("// {}.add<{}>()", binding.name, names.join(", ")));
            for component in components {
                ctx.components.resolve(&component.name, &component.span)?;
                w.line(format!(
                    "add_{}({}, {});",
                    component.name, WORLD, binding.name
                ));
            }
        }
        Stmt::DestroyEntity(binding) => {
            w.line(format!("// {}.destroy()", binding.name));
            w.line(format!("destroy_entity({}, {});", WORLD, binding.name));
        }
        Stmt::Foreach(foreach) => render_foreach(ctx, w, foreach)?,
    }
    Ok(())
}

/// Bounded loop over every id handed out so far, guarded by liveness and the filter.
fn render_foreach(
    ctx: &GenContext,
    w: &mut CodeWriter,
    foreach: &ForeachStmt,
) -> Result<(), CompileError> {
    let it = &foreach.iterator.name;
    let mut header = format!("// foreach {}", it);
    for component in &foreach.filter {
        header.push(' ');
        header.push_str(&component.name);
    }
    w.line(header);

    w.open(format!(
        "for (entity_id {it} = 0u; {it} < {world}->max_id; ++{it})",
        it = it,
        world = WORLD
    ));
    w.open(format!("if ({})", filter_test(ctx, foreach)?));
    render_block(ctx, w, &foreach.body)?;
    w.close();
    w.close();
    Ok(())
}

fn filter_test(ctx: &GenContext, foreach: &ForeachStmt) -> Result<String, CompileError> {
    let it = &foreach.iterator.name;
    let alive = format!("{}->alive[{}]", WORLD, it);

    let mut checks = Vec::with_capacity(foreach.filter.len());
    for component in &foreach.filter {
        let id = ctx.components.resolve(&component.name, &component.span)?;
        checks.push(format!("{}->components[{}][{}].exist", WORLD, id, it));
    }

    let test = match (checks.len(), ctx.options.filter_mode) {
        (0, _) => alive,
        (_, FilterMode::All) => format!("{} && {}", alive, checks.join(" && ")),
        (1, FilterMode::Any) => format!("{} && {}", alive, checks[0]),
        (_, FilterMode::Any) => format!("{} && ({})", alive, checks.join(" || ")),
    };
    Ok(test)
}
