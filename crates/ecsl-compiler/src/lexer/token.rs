use ecsl_common::Span;
use std::fmt;

/// A classified lexical unit with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    pub fn eof(span: Span) -> Self {
        Self {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            span,
        }
    }

    /// Human-readable form used in "expected X, found Y" messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Identifier => format!("identifier '{}'", self.lexeme),
            TokenKind::Unknown => format!("character '{}'", self.lexeme),
            TokenKind::Eof => "end of input".to_string(),
            kind => kind.describe().to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.lexeme)
    }
}

/// All token kinds of the ecsl DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,

    // === Keywords ===
    Struct,
    Component,
    Ent,
    Foreach,

    // === Punctuation ===
    LeftBrace,  // {
    RightBrace, // }
    LeftParen,  // (
    RightParen, // )
    Less,       // <
    Greater,    // >
    Comma,      // ,
    Dot,        // .
    Semicolon,  // ;
    Tilde,      // ~

    /// A character outside the DSL alphabet; rejected by the parser.
    Unknown,
    Eof,
}

impl TokenKind {
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s {
            "struct" => Some(TokenKind::Struct),
            "component" => Some(TokenKind::Component),
            "ent" => Some(TokenKind::Ent),
            "foreach" => Some(TokenKind::Foreach),
            _ => None,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Struct => "'struct'",
            TokenKind::Component => "'component'",
            TokenKind::Ent => "'ent'",
            TokenKind::Foreach => "'foreach'",
            TokenKind::LeftBrace => "'{'",
            TokenKind::RightBrace => "'}'",
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::Less => "'<'",
            TokenKind::Greater => "'>'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Semicolon => "';'",
            TokenKind::Tilde => "'~'",
            TokenKind::Unknown => "unknown character",
            TokenKind::Eof => "end of input",
        }
    }
}
