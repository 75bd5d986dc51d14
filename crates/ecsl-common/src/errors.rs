use thiserror::Error;

use crate::span::Span;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A secondary location attached to a diagnostic.
#[derive(Debug, Clone)]
pub struct RelatedSpan {
    pub span: Span,
    pub message: String,
}

/// A renderable compiler message (error or warning).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    pub related: Vec<RelatedSpan>,
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span: None,
            related: Vec::new(),
            suggestion: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span: None,
            related: Vec::new(),
            suggestion: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related.push(RelatedSpan {
            span,
            message: message.into(),
        });
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", prefix, self.message)?;
        if let Some(ref span) = self.span {
            write!(f, "\n  --> {}", span)?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics gathered by one stage.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>, span: Span) {
        self.report(Diagnostic::error(message).with_span(span));
    }

    pub fn warning(&mut self, message: impl Into<String>, span: Span) {
        self.report(Diagnostic::warning(message).with_span(span));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error())
    }

    /// First error in report order, if any.
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.is_error())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Coarse classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LexicalMismatch,
    UnknownIdentifier,
    StructuralError,
    DuplicateDefinition,
}

/// Fatal compilation error. The first one aborts the whole run.
#[derive(Error, Debug, Clone)]
pub enum CompileError {
    #[error("expected {expected}, found {found}")]
    LexicalMismatch {
        expected: String,
        found: String,
        span: Option<Span>,
    },

    #[error("unknown {kind} '{name}'")]
    UnknownIdentifier {
        kind: &'static str,
        name: String,
        span: Option<Span>,
    },

    #[error("{message}")]
    StructuralError { message: String, span: Option<Span> },

    #[error("{kind} '{name}' is defined more than once")]
    DuplicateDefinition {
        kind: &'static str,
        name: String,
        span: Option<Span>,
        first: Option<Span>,
    },
}

impl CompileError {
    pub fn lexical(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        CompileError::LexicalMismatch {
            expected: expected.into(),
            found: found.into(),
            span: Some(span),
        }
    }

    pub fn unknown(kind: &'static str, name: impl Into<String>, span: Option<Span>) -> Self {
        CompileError::UnknownIdentifier {
            kind,
            name: name.into(),
            span,
        }
    }

    pub fn structural(message: impl Into<String>, span: Option<Span>) -> Self {
        CompileError::StructuralError {
            message: message.into(),
            span,
        }
    }

    pub fn duplicate(
        kind: &'static str,
        name: impl Into<String>,
        span: Span,
        first: Span,
    ) -> Self {
        CompileError::DuplicateDefinition {
            kind,
            name: name.into(),
            span: Some(span),
            first: Some(first),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::LexicalMismatch { .. } => ErrorKind::LexicalMismatch,
            CompileError::UnknownIdentifier { .. } => ErrorKind::UnknownIdentifier,
            CompileError::StructuralError { .. } => ErrorKind::StructuralError,
            CompileError::DuplicateDefinition { .. } => ErrorKind::DuplicateDefinition,
        }
    }

    pub fn span(&self) -> Option<&Span> {
        match self {
            CompileError::LexicalMismatch { span, .. }
            | CompileError::UnknownIdentifier { span, .. }
            | CompileError::StructuralError { span, .. }
            | CompileError::DuplicateDefinition { span, .. } => span.as_ref(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.to_string());
        let diagnostic = match self.span() {
            Some(span) => diagnostic.with_span(span.clone()),
            None => diagnostic,
        };
        match self {
            CompileError::UnknownIdentifier { kind: "entity", name, .. } => diagnostic
                .with_suggestion(format!("declare it first with `ent {};`", name)),
            CompileError::UnknownIdentifier { kind: "component", name, .. } => diagnostic
                .with_suggestion(format!("declare it with `component {} {{ … }};`", name)),
            CompileError::DuplicateDefinition {
                first: Some(first), ..
            } => diagnostic.with_related(first.clone(), "first defined here"),
            _ => diagnostic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Position;

    fn span_at(line: u32, column: u32) -> Span {
        let start = Position {
            line,
            column,
            offset: 0,
        };
        Span::new("test.ecs", start, start)
    }

    #[test]
    fn unknown_identifier_display() {
        let err = CompileError::unknown("entity", "first", Some(span_at(1, 5)));
        assert_eq!(err.to_string(), "unknown entity 'first'");
        assert_eq!(err.kind(), ErrorKind::UnknownIdentifier);
    }

    #[test]
    fn diagnostic_carries_position() {
        let err = CompileError::lexical("';'", "'}'", span_at(4, 12));
        let diag = err.to_diagnostic();
        assert!(diag.is_error());
        assert_eq!(diag.to_string(), "error: expected ';', found '}'\n  --> test.ecs:4:12");
    }

    #[test]
    fn entity_errors_suggest_declaration() {
        let diag = CompileError::unknown("entity", "hero", None).to_diagnostic();
        assert_eq!(diag.suggestion.as_deref(), Some("declare it first with `ent hero;`"));
        assert!(diag.span.is_none());
    }

    #[test]
    fn duplicate_points_at_first_definition() {
        let err = CompileError::duplicate("component", "position", span_at(5, 11), span_at(2, 11));
        let diag = err.to_diagnostic();
        assert_eq!(diag.message, "component 'position' is defined more than once");
        assert_eq!(diag.related.len(), 1);
        assert_eq!(diag.related[0].span.start.line, 2);
    }

    #[test]
    fn bag_reports_first_error() {
        let mut bag = DiagnosticBag::new();
        bag.warning("unused", span_at(1, 1));
        bag.error("first", span_at(2, 1));
        bag.error("second", span_at(3, 1));
        assert!(bag.has_errors());
        assert_eq!(bag.first_error().map(|d| d.message.as_str()), Some("first"));
    }
}
