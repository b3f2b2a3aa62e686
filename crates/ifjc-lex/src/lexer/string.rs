//! String literal lexing.
//!
//! Covers single-line strings, triple-quoted multi-line strings with
//! indentation stripping, escape sequences, and `\(expr)`
//! interpolation. Interpolation re-enters the main tokenizer: the
//! accumulated prefix is emitted as a string token, a head marker
//! follows, the embedded expression is tokenized up to the balancing
//! `)`, and a span marker closes it. The span marker after the last
//! embedded expression is rewritten to a tail marker once the closing
//! quote is seen.

use ifjc_util::DiagResult;

use crate::token::{TokenCategory, TokenKind, TokenValue, Whitespace};
use crate::Lexer;

const MULTILINE_QUOTE: &str = "\"\"\"";

impl<'a> Lexer<'a> {
    /// Lexes a string literal starting at a `"` character.
    pub(crate) fn lex_string(&mut self, ws: Whitespace) -> DiagResult<()> {
        let multiline = self.cursor.match_str(MULTILINE_QUOTE);
        if !multiline {
            self.cursor.advance();
        }

        let mut piece_ws = ws;
        let mut content = String::new();

        loop {
            if multiline {
                if self.cursor.match_str(MULTILINE_QUOTE) {
                    break;
                }
            } else if self.cursor.current_char() == '"' {
                self.cursor.advance();
                break;
            }

            if self.cursor.is_at_end() {
                return Err(self.error_here("unterminated string literal"));
            }

            let c = self.cursor.current_char();

            if !multiline {
                if c == '\n' {
                    return Err(self.error_here("unterminated string literal"));
                }
                if (c as u32) < 0x20 || c == '\x7F' {
                    return Err(self.error_here(format!(
                        "unprintable ASCII character (code {}) in string literal",
                        c as u32
                    )));
                }
            }

            if c == '\\' {
                self.cursor.advance();
                let escaped = self.cursor.current_char();

                match escaped {
                    'u' => {
                        self.cursor.advance();
                        content.push(self.lex_unicode_escape()?);
                    }
                    '(' => {
                        // Emit the accumulated prefix and re-enter the
                        // tokenizer for the embedded expression.
                        let piece = self.make_token(
                            piece_ws,
                            TokenCategory::Literal,
                            TokenKind::String,
                            TokenValue::String(std::mem::take(&mut content)),
                        );
                        self.push_token(piece);
                        self.push_marker(TokenKind::StringHead);

                        self.cursor.advance();
                        self.lex_interpolation_run()?;

                        self.push_marker(TokenKind::StringSpan);
                        piece_ws = Whitespace::NONE;
                    }
                    _ => match resolve_escape(escaped) {
                        Some(ch) => {
                            content.push(ch);
                            self.cursor.advance();
                        }
                        None => {
                            return Err(self.error_here(format!(
                                "invalid escape sequence '\\{}' in literal",
                                escaped
                            )));
                        }
                    },
                }
            } else {
                content.push(c);
                self.cursor.advance();
            }
        }

        // The marker after the final embedded expression becomes the
        // tail once the closing quote is reached.
        if let Some(last) = self.tokens.last_mut() {
            if last.kind == TokenKind::StringSpan {
                last.kind = TokenKind::StringTail;
            }
        }

        if multiline {
            content = self.strip_multiline_indent(content)?;
        }

        let token = self.make_token(
            piece_ws,
            TokenCategory::Literal,
            TokenKind::String,
            TokenValue::String(content),
        );
        self.push_token(token);
        Ok(())
    }

    /// Tokenizes the body of a `\(expr)` interpolation up to the
    /// balancing `)`, which is consumed without producing a token.
    fn lex_interpolation_run(&mut self) -> DiagResult<()> {
        let mut depth = 1usize;

        loop {
            let ws = self.skim_whitespace()?;

            if self.cursor.is_at_end() {
                return Err(self.error_here(
                    "cannot find ')' to match opening '(' in string interpolation",
                ));
            }

            match self.cursor.current_char() {
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.cursor.advance();
                        return Ok(());
                    }
                }
                '(' => depth += 1,
                _ => {}
            }

            self.dispatch(ws)?;
        }
    }

    /// Lexes `{HHHH…}` after `\u`.
    fn lex_unicode_escape(&mut self) -> DiagResult<char> {
        if !self.cursor.match_char('{') {
            return Err(self.error_here("expected hexadecimal code in braces after unicode escape"));
        }

        let mut digits = String::new();
        while self.cursor.current_char().is_ascii_hexdigit() {
            digits.push(self.cursor.current_char());
            self.cursor.advance();
        }

        if digits.is_empty() || digits.len() > 8 {
            return Err(
                self.error_here("\\u{...} escape sequence expects between 1 and 8 hex digits")
            );
        }

        if !self.cursor.match_char('}') {
            return Err(self.error_here("expected closing brace '}' after unicode escape"));
        }

        let code = u32::from_str_radix(&digits, 16).unwrap_or(u32::MAX);
        match char::from_u32(code).filter(|_| code <= 0x10FFFF) {
            Some(c) => Ok(c),
            None => Err(self.error_here(format!("invalid unicode scalar '{}'", code))),
        }
    }

    /// Validates a multi-line string's shape and strips the
    /// terminator line's indentation from every content line.
    fn strip_multiline_indent(&self, content: String) -> DiagResult<String> {
        let mut lines: Vec<&str> = content.split('\n').collect();

        let first = lines.remove(0);
        if !first.is_empty() || lines.is_empty() {
            return Err(
                self.error_at_token("multi-line string literal content must begin on a new line")
            );
        }

        let indent = lines.pop().unwrap_or("");
        if indent.chars().any(|c| !matches!(c, ' ' | '\t' | '\x0C')) {
            return Err(self.error_at_token(
                "multi-line string literal closing delimiter must begin on a new line",
            ));
        }

        let mut stripped = Vec::with_capacity(lines.len());
        for line in lines {
            match line.strip_prefix(indent) {
                Some(rest) => stripped.push(rest),
                None => {
                    return Err(self.error_at_token(
                        "insufficient indentation of line in multi-line string literal",
                    ));
                }
            }
        }

        Ok(stripped.join("\n"))
    }

    fn push_marker(&mut self, kind: TokenKind) {
        let token = self.make_token(
            Whitespace::NONE,
            TokenCategory::InterpolationMarker,
            kind,
            TokenValue::None,
        );
        self.push_token(token);
    }
}

/// Resolves a single-character escape. An escaped line feed inside a
/// multi-line string keeps the line feed.
fn resolve_escape(c: char) -> Option<char> {
    match c {
        '0' => Some('\0'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        '\\' => Some('\\'),
        '\'' => Some('\''),
        '"' => Some('"'),
        '\n' => Some('\n'),
        _ => None,
    }
}
