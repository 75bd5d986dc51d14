use ecsl_common::{DiagnosticBag, Position};

use super::cursor::Cursor;
use super::token::{Token, TokenKind};

/// Hand-written lexer for the ecsl DSL.
///
/// Produces identifiers, the four keywords and single-character punctuation;
/// skips whitespace, `//` line comments and nested `/* */` block comments.
/// Characters outside the alphabet become `Unknown` tokens so the parser can
/// report them against the grammar position they appear in.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    diagnostics: DiagnosticBag,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, file: impl Into<String>) -> Self {
        Self {
            cursor: Cursor::new(source, file),
            diagnostics: DiagnosticBag::new(),
        }
    }

    /// Tokenize the entire source. The token list always ends with `Eof`.
    pub fn tokenize(mut self) -> (Vec<Token>, DiagnosticBag) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tracing::trace!(count = tokens.len(), "tokenized source");
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.cursor.position();
        let Some(ch) = self.cursor.advance() else {
            return Token::eof(self.cursor.span_from(start));
        };

        let kind = match ch {
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '<' => TokenKind::Less,
            '>' => TokenKind::Greater,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ';' => TokenKind::Semicolon,
            '~' => TokenKind::Tilde,
            c if is_ident_start(c) => return self.scan_identifier(start),
            _ => TokenKind::Unknown,
        };
        self.make_token(kind, start)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            self.cursor.eat_while(|c| c.is_whitespace());

            if self.cursor.peek() != Some('/') {
                break;
            }
            match self.cursor.peek_second() {
                Some('/') => self.cursor.eat_while(|c| c != '\n'),
                Some('*') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    self.skip_block_comment();
                }
                _ => break,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let mut depth: u32 = 1;
        while depth > 0 {
            match self.cursor.advance() {
                Some('/') if self.cursor.peek() == Some('*') => {
                    self.cursor.advance();
                    depth += 1;
                }
                Some('*') if self.cursor.peek() == Some('/') => {
                    self.cursor.advance();
                    depth -= 1;
                }
                Some(_) => {}
                None => {
                    let pos = self.cursor.position();
                    let span = self.cursor.span_from(pos);
                    self.diagnostics.error("unterminated block comment", span);
                    return;
                }
            }
        }
    }

    fn scan_identifier(&mut self, start: Position) -> Token {
        self.cursor.eat_while(is_ident_continue);
        let text = self.cursor.slice_from(start.offset);
        let kind = TokenKind::keyword_from_str(text).unwrap_or(TokenKind::Identifier);
        Token::new(kind, text, self.cursor.span_from(start))
    }

    fn make_token(&self, kind: TokenKind, start: Position) -> Token {
        let lexeme = self.cursor.slice_from(start.offset);
        Token::new(kind, lexeme, self.cursor.span_from(start))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
