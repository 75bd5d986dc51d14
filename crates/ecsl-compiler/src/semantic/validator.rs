use std::collections::{HashMap, HashSet};

use ecsl_common::{CompileError, DiagnosticBag, Span};

use crate::ast::*;

use super::names::{self, NameUse, RUNTIME_NAMES};

/// Whole-program checks that need every declaration in view.
///
/// Errors abort on the first hit; warnings accumulate in the returned bag.
pub struct Validator<'a> {
    primitives: &'a [String],
    diagnostics: DiagnosticBag,
}

impl<'a> Validator<'a> {
    pub fn new(primitives: &'a [String]) -> Self {
        Self {
            primitives,
            diagnostics: DiagnosticBag::new(),
        }
    }

    pub fn validate(mut self, program: &Program) -> Result<DiagnosticBag, CompileError> {
        self.check_aggregates(program)?;
        self.check_functions(program)?;
        self.check_c_names(program)?;
        self.check_component_references(program)?;
        self.check_bindings(program)?;
        Ok(self.diagnostics)
    }

    /// Unique type names, unique member names, member types already known.
    fn check_aggregates(&mut self, program: &Program) -> Result<(), CompileError> {
        let mut declared: HashMap<&str, &Span> = HashMap::new();

        for decl in program.aggregates() {
            let name = decl.name.name.as_str();
            if self.is_primitive(name) {
                return Err(CompileError::structural(
                    format!("'{}' is a primitive type and cannot be redeclared", name),
                    Some(decl.name.span.clone()),
                ));
            }
            names::check(&decl.name, NameUse::Global)?;

            for member in &decl.members {
                let type_name = member.type_name.name.as_str();
                if !self.is_primitive(type_name) && !declared.contains_key(type_name) {
                    return Err(CompileError::unknown(
                        "type",
                        type_name,
                        Some(member.type_name.span.clone()),
                    ));
                }
            }

            let mut members: HashMap<&str, &Span> = HashMap::new();
            for member in &decl.members {
                names::check(&member.name, NameUse::Member)?;
                if let Some(first) = members.insert(member.name.name.as_str(), &member.name.span) {
                    return Err(CompileError::duplicate(
                        "member",
                        format!("{}.{}", decl.name.name, member.name.name),
                        member.name.span.clone(),
                        first.clone(),
                    ));
                }
            }

            if let Some(first) = declared.insert(name, &decl.name.span) {
                return Err(CompileError::duplicate(
                    "type",
                    name,
                    decl.name.span.clone(),
                    first.clone(),
                ));
            }
        }
        Ok(())
    }

    /// Known return types, one signature and at most one body per name,
    /// `main` returning `int`; warn about prototypes never defined.
    fn check_functions(&mut self, program: &Program) -> Result<(), CompileError> {
        let mut signatures: HashMap<&str, &FunctionDecl> = HashMap::new();
        let mut defined: HashMap<&str, &Span> = HashMap::new();

        for func in program.functions() {
            let name = func.name.name.as_str();
            let return_type = func.return_type.name.as_str();
            names::check(&func.name, NameUse::Global)?;

            if return_type != "void"
                && !self.is_primitive(return_type)
                && program.aggregate(return_type).is_none()
            {
                return Err(CompileError::unknown(
                    "type",
                    return_type,
                    Some(func.return_type.span.clone()),
                ));
            }
            if name == "main" && return_type != "int" {
                return Err(CompileError::structural(
                    format!("'main' must return int, found '{}'", return_type),
                    Some(func.return_type.span.clone()),
                ));
            }

            let first = *signatures.entry(name).or_insert(func);
            if first.return_type.name != return_type {
                return Err(CompileError::structural(
                    format!(
                        "function '{}' returns '{}' here but '{}' at {}",
                        name, return_type, first.return_type.name, first.return_type.span
                    ),
                    Some(func.return_type.span.clone()),
                ));
            }

            if func.is_forward() {
                continue;
            }
            if let Some(first) = defined.insert(name, &func.name.span) {
                return Err(CompileError::duplicate(
                    "function",
                    name,
                    func.name.span.clone(),
                    first.clone(),
                ));
            }
        }

        for func in program.functions().filter(|f| f.is_forward()) {
            if !defined.contains_key(func.name.name.as_str()) {
                self.diagnostics.warning(
                    format!("function '{}' is declared but never defined", func.name.name),
                    func.name.span.clone(),
                );
            }
        }
        Ok(())
    }

    /// Every file-scope C name the program produces must be unique: typedefs,
    /// destructors, accessors, functions and the runtime's own symbols.
    fn check_c_names(&mut self, program: &Program) -> Result<(), CompileError> {
        let mut owners: HashMap<String, String> = RUNTIME_NAMES
            .iter()
            .map(|name| (name.to_string(), "the generated runtime".to_string()))
            .collect();

        for decl in program.aggregates() {
            let name = &decl.name.name;
            let what = if decl.component_id.is_some() {
                "component"
            } else {
                "struct"
            };
            let span = &decl.name.span;
            claim(&mut owners, name.clone(), format!("{} '{}'", what, name), span)?;
            claim(
                &mut owners,
                format!("{}_destroy", name),
                format!("the destructor of {} '{}'", what, name),
                span,
            )?;
            if decl.component_id.is_some() {
                claim(
                    &mut owners,
                    format!("add_{}", name),
                    format!("the add accessor of component '{}'", name),
                    span,
                )?;
                claim(
                    &mut owners,
                    format!("get_{}", name),
                    format!("the get accessor of component '{}'", name),
                    span,
                )?;
            }
        }

        let mut functions = HashSet::new();
        for func in program.functions() {
            let name = &func.name.name;
            if functions.insert(name.as_str()) {
                claim(
                    &mut owners,
                    name.clone(),
                    format!("function '{}'", name),
                    &func.name.span,
                )?;
            }
        }
        Ok(())
    }

    /// Every component named by `add<…>` or a foreach filter must be a component.
    fn check_component_references(&mut self, program: &Program) -> Result<(), CompileError> {
        let declared: HashSet<&str> =
            program.components().map(|c| c.name.name.as_str()).collect();
        let mut attached: HashSet<String> = HashSet::new();
        let mut result: Result<(), CompileError> = Ok(());

        for func in program.functions() {
            let Some(body) = &func.body else { continue };
            body.walk(&mut |stmt| {
                if result.is_err() {
                    return;
                }
                let (names, context) = match stmt {
                    Stmt::AddComponents { components, .. } => (components, "add list"),
                    Stmt::Foreach(foreach) => (&foreach.filter, "foreach filter"),
                    _ => return,
                };
                let mut seen = HashSet::new();
                for name in names {
                    if !declared.contains(name.name.as_str()) {
                        result = Err(CompileError::unknown(
                            "component",
                            &name.name,
                            Some(name.span.clone()),
                        ));
                        return;
                    }
                    if !seen.insert(name.name.as_str()) {
                        self.diagnostics.warning(
                            format!("component '{}' appears twice in this {}", name.name, context),
                            name.span.clone(),
                        );
                    }
                    if matches!(stmt, Stmt::AddComponents { .. }) {
                        attached.insert(name.name.clone());
                    }
                }
            });
            result.clone()?;
        }

        for component in program.components() {
            if !attached.contains(&component.name.name) {
                self.diagnostics.warning(
                    format!("component '{}' is never added to any entity", component.name.name),
                    component.name.span.clone(),
                );
            }
        }
        Ok(())
    }

    /// Function bodies call `add_NAME`; a local with that name would hide it.
    fn check_bindings(&mut self, program: &Program) -> Result<(), CompileError> {
        let accessors: HashSet<String> = program
            .components()
            .map(|c| format!("add_{}", c.name.name))
            .collect();
        let mut result: Result<(), CompileError> = Ok(());

        for func in program.functions() {
            let Some(body) = &func.body else { continue };
            body.walk(&mut |stmt| {
                if result.is_err() {
                    return;
                }
                let binding = match stmt {
                    Stmt::CreateEntity(binding) => binding,
                    Stmt::Foreach(foreach) => &foreach.iterator,
                    _ => return,
                };
                if accessors.contains(&binding.name) {
                    result = Err(CompileError::structural(
                        format!(
                            "entity '{}' would hide the generated accessor of the same name",
                            binding.name
                        ),
                        Some(binding.span.clone()),
                    ));
                }
            });
            result.clone()?;
        }
        Ok(())
    }

    fn is_primitive(&self, name: &str) -> bool {
        self.primitives.iter().any(|p| p == name)
    }
}

/// Record that `origin` produces the C identifier `c_name`.
fn claim(
    owners: &mut HashMap<String, String>,
    c_name: String,
    origin: String,
    span: &Span,
) -> Result<(), CompileError> {
    if let Some(owner) = owners.get(&c_name) {
        return Err(CompileError::structural(
            format!(
                "C name '{}' of {} clashes with {}",
                c_name, origin, owner
            ),
            Some(span.clone()),
        ));
    }
    owners.insert(c_name, origin);
    Ok(())
}

#[cfg(test)]
mod tests {
    use ecsl_common::{CompileError, DiagnosticBag, ErrorKind};

    use super::Validator;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn validate(source: &str) -> Result<DiagnosticBag, CompileError> {
        let (tokens, _) = Lexer::new(source, "test.ecs").tokenize();
        let program = Parser::new(tokens).parse().expect("parse failed");
        let primitives = vec!["int".to_string(), "float".to_string()];
        Validator::new(&primitives).validate(&program)
    }

    fn warnings(source: &str) -> Vec<String> {
        validate(source)
            .expect("validation failed")
            .into_diagnostics()
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    #[test]
    fn valid_program_has_no_warnings() {
        let source = "struct point { float x; float y; };
            component position { point vector; };
            ~int main() { ent first; first.add<position>(); first.destroy(); }";
        assert!(warnings(source).is_empty());
    }

    #[test]
    fn unknown_component_in_add_is_rejected() {
        let err = validate("struct s { int v; }; ~int main() { ent e; e.add<s>(); }").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownIdentifier);
        assert_eq!(err.to_string(), "unknown component 's'");
    }

    #[test]
    fn unknown_component_in_nested_foreach_is_rejected() {
        let err = validate(
            "component a { int v; }; ~int main() { foreach x a { foreach y ghost { } } }",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "unknown component 'ghost'");
    }

    #[test]
    fn unknown_member_type_is_rejected() {
        let err = validate("component a { vec3 v; };").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownIdentifier);
        assert_eq!(err.to_string(), "unknown type 'vec3'");
    }

    #[test]
    fn member_type_must_be_declared_earlier() {
        let err = validate("component a { point p; }; struct point { int x; };").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownIdentifier);
    }

    #[test]
    fn self_referential_member_is_rejected() {
        let err = validate("struct node { node next; };").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownIdentifier);
    }

    #[test]
    fn duplicate_type_is_rejected() {
        let err = validate("struct p { int x; }; component p { int y; };").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateDefinition);
    }

    #[test]
    fn duplicate_member_is_rejected() {
        let err = validate("struct p { int x; float x; };").unwrap_err();
        assert_eq!(err.to_string(), "member 'p.x' is defined more than once");
    }

    #[test]
    fn primitive_cannot_be_redeclared() {
        let err = validate("struct int { float x; };").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralError);
    }

    #[test]
    fn duplicate_function_body_is_rejected() {
        let err = validate("~int main() { } ~int main() { }").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateDefinition);
    }

    #[test]
    fn prototype_then_definition_is_fine() {
        assert!(warnings("~void tick(); ~void tick() { }").is_empty());
    }

    #[test]
    fn undefined_prototype_warns() {
        let found = warnings("~void tick();");
        assert_eq!(found, vec!["function 'tick' is declared but never defined"]);
    }

    #[test]
    fn repeated_component_in_add_warns() {
        let found = warnings("component a { int v; }; ~int main() { ent e; e.add<a, a>(); }");
        assert_eq!(found, vec!["component 'a' appears twice in this add list"]);
    }

    #[test]
    fn never_added_component_warns() {
        let found = warnings("component a { int v; }; ~int main() { foreach e a { } }");
        assert_eq!(found, vec!["component 'a' is never added to any entity"]);
    }

    // ========================================================================
    // Names in the generated C
    // ========================================================================

    fn structural_message(source: &str) -> String {
        let err = validate(source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralError, "{}", err);
        err.to_string()
    }

    #[test]
    fn components_may_share_names_with_runtime_locals() {
        let source = "component entity { int v; }; component info { int v; };
            ~int main() { ent e; e.add<entity, info>(); }";
        assert!(warnings(source).is_empty());
    }

    #[test]
    fn struct_whose_destructor_is_a_runtime_function_is_rejected() {
        assert_eq!(
            structural_message("struct world { int v; };"),
            "C name 'world_destroy' of the destructor of struct 'world' clashes with the generated runtime"
        );
    }

    #[test]
    fn runtime_function_names_are_rejected() {
        for name in ["create", "cleanup", "destroy_entity", "world_create"] {
            let message = structural_message(&format!("~void {}() {{ }}", name));
            assert!(message.contains("reserved by the generated runtime"), "{}", message);
        }
        let message = structural_message("component entity_id { int v; };");
        assert!(message.contains("reserved by the generated runtime"));
    }

    #[test]
    fn keyword_names_are_rejected() {
        assert_eq!(
            structural_message("struct p { int for; };"),
            "'for' is a C keyword and cannot be used as a member name"
        );
        structural_message("component static { int v; };");
        structural_message("~void while() { }");
    }

    #[test]
    fn runtime_names_are_fine_as_members() {
        assert!(validate("struct p { int create; int entity_id; };").is_ok());
    }

    #[test]
    fn function_named_after_an_accessor_is_rejected() {
        assert_eq!(
            structural_message("component position { int v; }; ~void get_position() { }"),
            "C name 'get_position' of function 'get_position' clashes with the get accessor of component 'position'"
        );
        structural_message("struct p { int v; }; ~void p_destroy() { }");
        structural_message("struct tick { int v; }; ~void tick() { }");
    }

    #[test]
    fn aggregates_whose_generated_names_collide_are_rejected() {
        let message = structural_message("struct a_destroy { int v; }; struct a { int v; };");
        assert!(message.contains("'a_destroy'"), "{}", message);
        structural_message("component add_p { int v; }; component p { int v; };");
    }

    #[test]
    fn prototype_and_definition_must_agree_on_return_type() {
        let message = structural_message("~void tick(); ~int tick() { }");
        assert!(
            message.starts_with("function 'tick' returns 'int' here but 'void' at test.ecs:1:"),
            "{}",
            message
        );
        structural_message("~int tick() { } ~float tick();");
    }

    #[test]
    fn main_must_return_int() {
        assert_eq!(
            structural_message("~void main() { }"),
            "'main' must return int, found 'void'"
        );
        structural_message("~float main() { }");
        assert!(validate("~int main();  ~int main() { }").is_ok());
    }

    #[test]
    fn unknown_return_type_is_rejected() {
        let err = validate("~vec3 make() { }").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownIdentifier);
        assert_eq!(err.to_string(), "unknown type 'vec3'");
        assert!(validate("struct p { int v; }; ~p make() { }").is_ok());
    }

    #[test]
    fn entity_named_after_an_add_accessor_is_rejected() {
        let message = structural_message(
            "component position { int v; }; ~int main() { foreach x { ent add_position; } }",
        );
        assert_eq!(
            message,
            "entity 'add_position' would hide the generated accessor of the same name"
        );
    }
}
