//! Core lexer: dispatch loop, token cache and error reporting.

use ifjc_util::{DiagResult, Diagnostic, ErrorKind, Span};

use crate::cursor::Cursor;
use crate::token::{Token, TokenCategory, TokenKind, TokenValue, Whitespace};

/// Hand-written tokenizer for IFJ23.
///
/// Tokens are appended to an internal cache as they are produced, so
/// a consumer may address any already-lexed token again without
/// rework. The whitespace skimmed before a token supplies that
/// token's left-side profile and, mirrored, the previous token's
/// right-side profile.
pub struct Lexer<'a> {
    /// Character cursor over the source.
    pub(crate) cursor: Cursor<'a>,

    /// All tokens produced so far, in source order.
    pub(crate) tokens: Vec<Token>,

    /// Start byte offset of the token being lexed.
    pub(crate) token_start: usize,

    /// Line of the token start (1-based).
    pub(crate) token_start_line: u32,

    /// Column of the token start (1-based).
    pub(crate) token_start_column: u32,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            tokens: Vec::new(),
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    /// Returns the tokens produced so far.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Lexes forward until at least one more token is cached.
    ///
    /// A single call may append several tokens: a string literal with
    /// interpolations emits its pieces, markers and the embedded
    /// expression tokens in one go.
    pub fn tokenize_one(&mut self) -> DiagResult<()> {
        let ws = self.skim_whitespace()?;
        self.dispatch(ws)
    }

    /// Drains the whole source, returning the complete token sequence
    /// ending in the end-of-input token.
    pub fn tokenize_all(&mut self) -> DiagResult<&[Token]> {
        while !self.tokens.last().map_or(false, Token::is_eof) {
            self.tokenize_one()?;
        }
        Ok(&self.tokens)
    }

    /// Lexes exactly one lexeme starting at the cursor, with `ws` as
    /// its left-side whitespace profile.
    pub(crate) fn dispatch(&mut self, ws: Whitespace) -> DiagResult<()> {
        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();

        if self.cursor.is_at_end() {
            let token = Token::new(
                TokenCategory::Eof,
                TokenKind::Default,
                ws,
                self.token_span(),
                TokenValue::None,
            );
            self.push_token(token);
            return Ok(());
        }

        let c = self.cursor.current_char();

        if c == '"' {
            return self.lex_string(ws);
        }

        if is_identifier_start(c) {
            return self.lex_identifier(ws);
        }

        if c.is_ascii_digit() {
            return self.lex_number(ws);
        }

        // A float may not start with its dot.
        if c == '.'
            && self.cursor.peek_char(1).is_ascii_digit()
            && !self.cursor.starts_with("...")
            && !self.cursor.starts_with("..<")
        {
            return Err(self.error_here("expected a digit before '.'"));
        }

        if self.lex_operator(ws)? {
            return Ok(());
        }

        Err(self.error_here(format!("unexpected token '{}'", c)))
    }

    /// Appends a token, mirroring its left whitespace onto the right
    /// side of the previous token.
    pub(crate) fn push_token(&mut self, token: Token) {
        if let Some(prev) = self.tokens.last_mut() {
            prev.whitespace = prev.whitespace.union(token.whitespace.left_to_right());
        }
        self.tokens.push(token);
    }

    /// Returns the span from the token start to the cursor.
    pub(crate) fn token_span(&self) -> Span {
        Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.token_start_column,
        )
    }

    /// Builds a lexical-error diagnostic with a caret marker at the
    /// current character.
    pub(crate) fn error_here(&self, message: impl Into<String>) -> Diagnostic {
        let at = self.cursor.position();
        let marker = Span::new(at, at + 1, self.cursor.line(), self.cursor.column());
        Diagnostic::error(ErrorKind::Lexical, message).with_marker(marker)
    }

    /// Builds a lexical-error diagnostic covering the current token.
    pub(crate) fn error_at_token(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(ErrorKind::Lexical, message).with_marker(self.token_span())
    }
}

/// Returns true for characters that may start an identifier.
#[inline]
pub(crate) fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

/// Returns true for characters that may continue an identifier.
#[inline]
pub(crate) fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}
