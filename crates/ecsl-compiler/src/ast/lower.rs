//! Flattening of the AST into the order-significant `Definition` list.

use ecsl_common::ir::{Definition, IrModule};

use super::nodes::*;

pub const IR_VERSION: &str = "0.1.0";

impl Program {
    /// Flatten into the positional encoding: members follow their aggregate,
    /// bodies are wrapped in `ScopeBegin`/`ScopeEnd`, `EndOfProgram` comes last.
    pub fn definitions(&self) -> Vec<Definition> {
        let mut out = Vec::new();
        for item in &self.items {
            match item {
                Item::Struct(decl) => {
                    out.push(Definition::Struct {
                        name: decl.name.name.clone(),
                    });
                    lower_members(decl, &mut out);
                }
                Item::Component(decl) => {
                    out.push(Definition::Component {
                        name: decl.name.name.clone(),
                        component_id: decl.component_id.unwrap_or_default(),
                    });
                    lower_members(decl, &mut out);
                }
                Item::Function(func) => {
                    out.push(Definition::Function {
                        return_type: func.return_type.name.clone(),
                        name: func.name.name.clone(),
                    });
                    if let Some(body) = &func.body {
                        lower_block(body, &mut out);
                    }
                }
            }
        }
        out.push(Definition::EndOfProgram);
        out
    }

    pub fn to_ir_module(&self, module: &str, source_file: &str) -> IrModule {
        IrModule {
            version: IR_VERSION.to_string(),
            module: module.to_string(),
            source_file: source_file.to_string(),
            component_count: self.component_count(),
            definitions: self.definitions(),
        }
    }
}

fn lower_members(decl: &AggregateDecl, out: &mut Vec<Definition>) {
    out.extend(decl.members.iter().map(|member| Definition::Member {
        type_name: member.type_name.name.clone(),
        name: member.name.name.clone(),
    }));
}

fn lower_block(block: &Block, out: &mut Vec<Definition>) {
    out.push(Definition::ScopeBegin);
    for stmt in &block.stmts {
        match stmt {
            Stmt::CreateEntity(binding) => out.push(Definition::CreateEntity {
                binding: binding.name.clone(),
            }),
            Stmt::AddComponents {
                binding,
                components,
            } => out.push(Definition::AddComponents {
                binding: binding.name.clone(),
                components: components.iter().map(|c| c.name.clone()).collect(),
            }),
            Stmt::DestroyEntity(binding) => out.push(Definition::DestroyEntity {
                binding: binding.name.clone(),
            }),
            Stmt::Foreach(foreach) => {
                out.push(Definition::ForeachLoop {
                    iterator: foreach.iterator.name.clone(),
                    filter: foreach.filter.iter().map(|c| c.name.clone()).collect(),
                });
                lower_block(&foreach.body, out);
            }
        }
    }
    out.push(Definition::ScopeEnd);
}
