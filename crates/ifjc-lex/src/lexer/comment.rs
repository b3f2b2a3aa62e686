//! Whitespace and comment skimming.
//!
//! The skimmer runs before every lexeme. It classifies what it
//! consumed so the next token's whitespace profile can record whether
//! a space or a newline stood to its left: line comments and block
//! comments spanning more than one line count as newline, a block
//! comment on a single line counts as space.

use ifjc_util::DiagResult;

use crate::token::Whitespace;
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Consumes whitespace and comments, returning the left-side
    /// whitespace class of whatever follows.
    pub(crate) fn skim_whitespace(&mut self) -> DiagResult<Whitespace> {
        let mut class = Whitespace::NONE;

        loop {
            let c = self.cursor.current_char();

            if is_space_like(c) {
                while is_space_like(self.cursor.current_char()) {
                    self.cursor.advance();
                }
                class = class.union(Whitespace::LEFT_SPACE);
            } else if is_newline(c) {
                while is_newline(self.cursor.current_char()) {
                    self.cursor.advance();
                }
                class = class.union(Whitespace::LEFT_NEWLINE);
            } else if self.cursor.starts_with("//") {
                while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                    self.cursor.advance();
                }
                class = class.union(Whitespace::LEFT_NEWLINE);
            } else if self.cursor.starts_with("/*") {
                class = class.union(self.skim_block_comment()?);
            } else if self.cursor.starts_with("*/") {
                return Err(self.error_here("unexpected end of block comment"));
            } else {
                return Ok(class);
            }
        }
    }

    /// Consumes a block comment, tracking nesting depth.
    fn skim_block_comment(&mut self) -> DiagResult<Whitespace> {
        debug_assert!(self.cursor.starts_with("/*"));
        self.cursor.match_str("/*");

        let mut depth = 1usize;
        let mut spans_newline = false;

        while depth > 0 {
            if self.cursor.is_at_end() {
                return Err(self.error_here("unterminated '/*' comment"));
            }

            if self.cursor.match_str("/*") {
                depth += 1;
            } else if self.cursor.match_str("*/") {
                depth -= 1;
            } else {
                if is_newline(self.cursor.current_char()) {
                    spans_newline = true;
                }
                self.cursor.advance();
            }
        }

        Ok(if spans_newline {
            Whitespace::LEFT_NEWLINE
        } else {
            Whitespace::LEFT_SPACE
        })
    }
}

#[inline]
fn is_space_like(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\x0C'
}

#[inline]
fn is_newline(c: char) -> bool {
    c == '\n' || c == '\r'
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifjc_util::ErrorKind;

    fn first_kind(source: &str) -> crate::TokenKind {
        let mut lexer = Lexer::new(source);
        lexer.tokenize_one().unwrap();
        lexer.tokens()[0].kind
    }

    #[test]
    fn test_skips_line_comment() {
        assert_eq!(first_kind("// comment\nif"), crate::TokenKind::If);
    }

    #[test]
    fn test_skips_block_comment() {
        assert_eq!(first_kind("/* comment */if"), crate::TokenKind::If);
    }

    #[test]
    fn test_nested_block_comment() {
        assert_eq!(
            first_kind("/* outer /* inner */ still outer */if"),
            crate::TokenKind::If
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut lexer = Lexer::new("/* open /* nested */");
        let err = lexer.tokenize_one().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Lexical);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_unmatched_comment_end() {
        let mut lexer = Lexer::new("*/");
        let err = lexer.tokenize_one().unwrap_err();
        assert!(err.message.contains("unexpected end of block comment"));
    }

    #[test]
    fn test_inline_block_comment_counts_as_space() {
        let mut lexer = Lexer::new("a/* c */b");
        let tokens = lexer.tokenize_all().unwrap();
        assert!(tokens[1].whitespace.has_left());
        assert!(!tokens[1].whitespace.has_left_newline());
    }

    #[test]
    fn test_multiline_block_comment_counts_as_newline() {
        let mut lexer = Lexer::new("a/* c\n */b");
        let tokens = lexer.tokenize_all().unwrap();
        assert!(tokens[1].whitespace.has_left_newline());
    }
}
