//! Identifiers the generated C already uses.
//!
//! Every DSL name is copied into the output verbatim, so a name that is a C
//! keyword, a macro from the included headers, or one of the runtime's own
//! symbols would produce C that does not compile.

use ecsl_common::CompileError;

use crate::ast::Ident;

/// Where a DSL name ends up in the generated C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameUse {
    /// Struct, component or function name: a file-scope identifier.
    Global,
    /// Entity binding or foreach iterator: a block-scope variable.
    Local,
    /// Aggregate member: lives in the struct's own namespace.
    Member,
}

impl NameUse {
    pub fn describe(self) -> &'static str {
        match self {
            NameUse::Global => "a type or function name",
            NameUse::Local => "an entity name",
            NameUse::Member => "a member name",
        }
    }
}

/// C99 and C11 keywords.
pub const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Alignas", "_Alignof", "_Atomic", "_Bool",
    "_Complex", "_Generic", "_Imaginary", "_Noreturn", "_Static_assert", "_Thread_local",
];

/// Object-like macros visible in the generated file. These expand everywhere,
/// member names included.
pub const MACROS: &[&str] = &[
    "COMPONENT_COUNT", "MAX_ENTITY_COUNT", "NULL", "EXIT_SUCCESS", "EXIT_FAILURE", "RAND_MAX",
    "MB_CUR_MAX", "bool", "true", "false", "__bool_true_false_are_defined", "INT8_MIN",
    "INT8_MAX", "INT16_MIN", "INT16_MAX", "INT32_MIN", "INT32_MAX", "INT64_MIN", "INT64_MAX",
    "UINT8_MAX", "UINT16_MAX", "UINT32_MAX", "UINT64_MAX", "SIZE_MAX", "PTRDIFF_MIN",
    "PTRDIFF_MAX", "INTPTR_MIN", "INTPTR_MAX", "UINTPTR_MAX", "INTMAX_MIN", "INTMAX_MAX",
    "UINTMAX_MAX",
];

/// Types and functions of the generated runtime. Function bodies call some of
/// them, so they are off limits for bindings as well.
pub const RUNTIME_NAMES: &[&str] = &[
    "ecs",
    "entity_id",
    "component_info",
    "ecs_world",
    "create",
    "destroy_entity",
    "cleanup",
    "world_create",
    "world_destroy",
];

/// Prefix of every parameter and local inside the generated runtime.
pub const RUNTIME_PREFIX: &str = "ecs_";

/// File-scope names declared by `<stddef.h>`, `<stdint.h>`, `<stdlib.h>` and `<string.h>`.
pub const LIBRARY_NAMES: &[&str] = &[
    // stddef.h
    "size_t", "ptrdiff_t", "wchar_t", "offsetof",
    // stdint.h
    "int8_t", "int16_t", "int32_t", "int64_t", "uint8_t", "uint16_t", "uint32_t", "uint64_t",
    "int_least8_t", "int_least16_t", "int_least32_t", "int_least64_t", "uint_least8_t",
    "uint_least16_t", "uint_least32_t", "uint_least64_t", "int_fast8_t", "int_fast16_t",
    "int_fast32_t", "int_fast64_t", "uint_fast8_t", "uint_fast16_t", "uint_fast32_t",
    "uint_fast64_t", "intptr_t", "uintptr_t", "intmax_t", "uintmax_t",
    // stdlib.h
    "abort", "abs", "atexit", "atof", "atoi", "atol", "atoll", "bsearch", "calloc", "div",
    "div_t", "exit", "_Exit", "free", "getenv", "labs", "ldiv", "ldiv_t", "llabs", "lldiv",
    "lldiv_t", "malloc", "mblen", "mbstowcs", "mbtowc", "qsort", "rand", "realloc", "srand",
    "strtod", "strtof", "strtol", "strtold", "strtoll", "strtoul", "strtoull", "system",
    "wcstombs", "wctomb",
    // string.h
    "memchr", "memcmp", "memcpy", "memmove", "memset", "strcat", "strchr", "strcmp", "strcoll",
    "strcpy", "strcspn", "strerror", "strlen", "strncat", "strncmp", "strncpy", "strpbrk",
    "strrchr", "strspn", "strstr", "strtok", "strxfrm",
];

/// Why `name` cannot be used as `usage`, or `None` when it is free.
pub fn reserved(name: &str, usage: NameUse) -> Option<&'static str> {
    if C_KEYWORDS.contains(&name) {
        return Some("a C keyword");
    }
    if MACROS.contains(&name) {
        return Some("a macro in the generated C");
    }
    if is_reserved_by_c(name) {
        return Some("reserved by the C standard");
    }
    if usage == NameUse::Member {
        return None;
    }
    if RUNTIME_NAMES.contains(&name) || name.starts_with(RUNTIME_PREFIX) {
        return Some("reserved by the generated runtime");
    }
    if usage == NameUse::Global && LIBRARY_NAMES.contains(&name) {
        return Some("declared by the C standard library");
    }
    None
}

/// Reject `ident` with a `StructuralError` when it cannot be used as `usage`.
pub fn check(ident: &Ident, usage: NameUse) -> Result<(), CompileError> {
    match reserved(&ident.name, usage) {
        Some(reason) => Err(CompileError::structural(
            format!(
                "'{}' is {} and cannot be used as {}",
                ident.name,
                reason,
                usage.describe()
            ),
            Some(ident.span.clone()),
        )),
        None => Ok(()),
    }
}

/// `__x` and `_X` are reserved in every scope.
fn is_reserved_by_c(name: &str) -> bool {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some('_'), Some(c)) => c == '_' || c.is_ascii_uppercase(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_reserved_everywhere() {
        for usage in [NameUse::Global, NameUse::Local, NameUse::Member] {
            assert_eq!(reserved("for", usage), Some("a C keyword"));
            assert_eq!(reserved("true", usage), Some("a macro in the generated C"));
            assert_eq!(reserved("__x", usage), Some("reserved by the C standard"));
        }
    }

    #[test]
    fn runtime_names_are_free_for_members() {
        assert!(reserved("create", NameUse::Member).is_none());
        assert!(reserved("create", NameUse::Local).is_some());
        assert!(reserved("ecs_self", NameUse::Global).is_some());
    }

    #[test]
    fn library_names_only_clash_at_file_scope() {
        assert_eq!(
            reserved("free", NameUse::Global),
            Some("declared by the C standard library")
        );
        assert!(reserved("free", NameUse::Local).is_none());
    }

    #[test]
    fn check_reports_the_reason() {
        let ident = Ident::new("malloc", ecsl_common::Span::dummy());
        let err = check(&ident, NameUse::Global).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'malloc' is declared by the C standard library and cannot be used as a type or function name"
        );
        assert!(check(&ident, NameUse::Member).is_ok());
    }

    #[test]
    fn ordinary_names_are_free() {
        for name in ["position", "entity", "info", "world", "_private", "e"] {
            assert!(reserved(name, NameUse::Global).is_none(), "{}", name);
        }
    }
}
