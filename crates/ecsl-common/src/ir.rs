use serde::{Deserialize, Serialize};

/// Envelope for the flat definition list, serialized by `ecslc --emit-ir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrModule {
    pub version: String,
    pub module: String,
    pub source_file: String,
    pub component_count: usize,
    pub definitions: Vec<Definition>,
}

/// One node of the flat, order-significant IR.
///
/// Members belong to the nearest preceding `Struct`/`Component`; statements
/// belong to the innermost open `ScopeBegin`. The list always ends with
/// `EndOfProgram`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Definition {
    Struct {
        name: String,
    },
    Component {
        name: String,
        component_id: usize,
    },
    Member {
        type_name: String,
        name: String,
    },
    Function {
        return_type: String,
        name: String,
    },
    CreateEntity {
        binding: String,
    },
    AddComponents {
        binding: String,
        components: Vec<String>,
    },
    DestroyEntity {
        binding: String,
    },
    ForeachLoop {
        iterator: String,
        filter: Vec<String>,
    },
    ScopeBegin,
    ScopeEnd,
    EndOfProgram,
}

impl Definition {
    pub fn is_scope_begin(&self) -> bool {
        matches!(self, Definition::ScopeBegin)
    }

    pub fn is_scope_end(&self) -> bool {
        matches!(self, Definition::ScopeEnd)
    }
}

/// Check that scope markers nest properly and the list is terminated.
///
/// On failure returns the index of the first offending definition.
pub fn scope_balance(definitions: &[Definition]) -> Result<(), usize> {
    let mut depth = 0usize;
    for (index, def) in definitions.iter().enumerate() {
        match def {
            Definition::ScopeBegin => depth += 1,
            Definition::ScopeEnd => {
                depth = depth.checked_sub(1).ok_or(index)?;
            }
            Definition::EndOfProgram => {
                if depth != 0 || index + 1 != definitions.len() {
                    return Err(index);
                }
                return Ok(());
            }
            _ => {}
        }
    }
    Err(definitions.len())
}

/// Index one past the `ScopeEnd` matching the `ScopeBegin` at `begin`.
pub fn scope_end(definitions: &[Definition], begin: usize) -> Option<usize> {
    if !definitions.get(begin)?.is_scope_begin() {
        return None;
    }
    let mut depth = 0usize;
    for (index, def) in definitions.iter().enumerate().skip(begin) {
        match def {
            Definition::ScopeBegin => depth += 1,
            Definition::ScopeEnd => {
                depth -= 1;
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function_with_foreach() -> Vec<Definition> {
        vec![
            Definition::Function {
                return_type: "int".into(),
                name: "main".into(),
            },
            Definition::ScopeBegin,
            Definition::ForeachLoop {
                iterator: "e".into(),
                filter: vec![],
            },
            Definition::ScopeBegin,
            Definition::ScopeEnd,
            Definition::ScopeEnd,
            Definition::EndOfProgram,
        ]
    }

    #[test]
    fn balanced_scopes_pass() {
        assert_eq!(scope_balance(&function_with_foreach()), Ok(()));
    }

    #[test]
    fn unbalanced_scope_reports_index() {
        let mut defs = function_with_foreach();
        defs.remove(5);
        assert_eq!(scope_balance(&defs), Err(5));
    }

    #[test]
    fn missing_terminator_fails() {
        let mut defs = function_with_foreach();
        defs.pop();
        assert_eq!(scope_balance(&defs), Err(6));
    }

    #[test]
    fn scope_end_finds_matching_marker() {
        let defs = function_with_foreach();
        assert_eq!(scope_end(&defs, 1), Some(6));
        assert_eq!(scope_end(&defs, 3), Some(5));
        assert_eq!(scope_end(&defs, 0), None);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let def = Definition::Component {
            name: "position".into(),
            component_id: 0,
        };
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["kind"], "component");
        assert_eq!(json["component_id"], 0);
    }
}
