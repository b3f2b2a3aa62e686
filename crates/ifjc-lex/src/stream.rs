//! Cached random-access token stream.
//!
//! The parser consumes tokens through a [`TokenStream`], which lexes
//! lazily but caches every produced token, so peeking at arbitrary
//! positive or negative offsets never regenerates work and never
//! loses a token.

use ifjc_util::{DiagResult, Diagnostic, ErrorKind};

use crate::token::Token;
use crate::Lexer;

/// A lazily-filled, fully-cached stream of tokens.
///
/// # Examples
///
/// ```
/// use ifjc_lex::TokenStream;
///
/// let mut stream = TokenStream::new("let x = 1");
/// let ahead = stream.peek(2).unwrap();
/// let first = stream.next().unwrap();
/// assert_eq!(first.text(), Some("let"));
/// assert_eq!(ahead.text(), Some("x"));
/// ```
pub struct TokenStream<'a> {
    lexer: Lexer<'a>,
    /// Index of the last consumed token, or -1 before the first.
    current: isize,
}

impl<'a> TokenStream<'a> {
    /// Creates a stream over the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            current: -1,
        }
    }

    /// Consumes and returns the next token. At the end of input the
    /// end-of-input token is returned again on every call.
    pub fn next(&mut self) -> DiagResult<Token> {
        let index = self.ensure((self.current + 1) as usize)?;
        self.current = index as isize;
        Ok(self.lexer.tokens[index].clone())
    }

    /// Peeks at the token `offset` positions away from the cursor
    /// without consuming anything. `peek(1)` is the next unconsumed
    /// token; negative offsets address already-consumed tokens.
    pub fn peek(&mut self, offset: isize) -> DiagResult<Token> {
        let index = self.current + offset;
        if index < 0 {
            return Err(Diagnostic::error(
                ErrorKind::Internal,
                "peek before the start of the token stream",
            ));
        }

        let index = self.ensure(index as usize)?;
        Ok(self.lexer.tokens[index].clone())
    }

    /// Returns true once the next token is end-of-input.
    pub fn is_at_end(&mut self) -> DiagResult<bool> {
        Ok(self.peek(1)?.is_eof())
    }

    /// Fills the cache up to `index` and returns the index clamped to
    /// the end-of-input token.
    fn ensure(&mut self, index: usize) -> DiagResult<usize> {
        while self.lexer.tokens.len() <= index
            && !self.lexer.tokens.last().map_or(false, Token::is_eof)
        {
            self.lexer.tokenize_one()?;
        }

        Ok(index.min(self.lexer.tokens.len() - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    #[test]
    fn test_next_sequence() {
        let mut stream = TokenStream::new("var a = 1");
        assert_eq!(stream.next().unwrap().kind, TokenKind::Var);
        assert_eq!(stream.next().unwrap().text(), Some("a"));
        assert_eq!(stream.next().unwrap().kind, TokenKind::Equal);
        assert_eq!(stream.next().unwrap().kind, TokenKind::Integer);
        assert!(stream.next().unwrap().is_eof());
        assert!(stream.next().unwrap().is_eof());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut stream = TokenStream::new("a b");
        assert_eq!(stream.peek(1).unwrap().text(), Some("a"));
        assert_eq!(stream.peek(2).unwrap().text(), Some("b"));
        assert_eq!(stream.next().unwrap().text(), Some("a"));
    }

    #[test]
    fn test_peek_backward() {
        let mut stream = TokenStream::new("a b c");
        stream.next().unwrap();
        stream.next().unwrap();
        assert_eq!(stream.peek(0).unwrap().text(), Some("b"));
        assert_eq!(stream.peek(-1).unwrap().text(), Some("a"));
    }

    #[test]
    fn test_peek_before_start() {
        let mut stream = TokenStream::new("a");
        let err = stream.peek(-1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_peek_past_end_clamps_to_eof() {
        let mut stream = TokenStream::new("a");
        assert!(stream.peek(10).unwrap().is_eof());
    }

    #[test]
    fn test_is_at_end() {
        let mut stream = TokenStream::new("a");
        assert!(!stream.is_at_end().unwrap());
        stream.next().unwrap();
        assert!(stream.is_at_end().unwrap());
    }

    #[test]
    fn test_lexer_error_propagates() {
        let mut stream = TokenStream::new("let a = \"unterminated");
        let mut result = Ok(());
        for _ in 0..8 {
            if let Err(e) = stream.next() {
                result = Err(e);
                break;
            }
        }
        assert_eq!(result.unwrap_err().kind, ErrorKind::Lexical);
    }
}
