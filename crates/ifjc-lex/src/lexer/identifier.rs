//! Identifier and keyword lexing.

use ifjc_util::DiagResult;

use crate::lexer::core::is_identifier_part;
use crate::token::{Token, TokenCategory, TokenKind, TokenValue, Whitespace};
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes an identifier, keyword, or keyword-shaped literal
    /// (`true`, `false`, `nil`).
    pub(crate) fn lex_identifier(&mut self, ws: Whitespace) -> DiagResult<()> {
        let start = self.cursor.position();

        while is_identifier_part(self.cursor.current_char()) {
            self.cursor.advance();
        }

        let text = self.cursor.slice_from(start);

        let token = match text {
            "true" => self.make_token(ws, TokenCategory::Literal, TokenKind::Boolean, TokenValue::Boolean(true)),
            "false" => self.make_token(ws, TokenCategory::Literal, TokenKind::Boolean, TokenValue::Boolean(false)),
            "nil" => self.make_token(ws, TokenCategory::Literal, TokenKind::Nil, TokenValue::None),

            "if" => self.keyword(ws, TokenKind::If, text),
            "else" => self.keyword(ws, TokenKind::Else, text),
            "var" => self.keyword(ws, TokenKind::Var, text),
            "let" => self.keyword(ws, TokenKind::Let, text),
            "while" => self.keyword(ws, TokenKind::While, text),
            "for" => self.keyword(ws, TokenKind::For, text),
            "in" => self.keyword(ws, TokenKind::In, text),
            "func" => self.keyword(ws, TokenKind::Func, text),
            "return" => self.keyword(ws, TokenKind::Return, text),
            "break" => self.keyword(ws, TokenKind::Break, text),
            "continue" => self.keyword(ws, TokenKind::Continue, text),

            _ => self.make_token(
                ws,
                TokenCategory::Identifier,
                TokenKind::Default,
                TokenValue::String(text.to_string()),
            ),
        };

        self.push_token(token);
        Ok(())
    }

    fn keyword(&self, ws: Whitespace, kind: TokenKind, text: &str) -> Token {
        self.make_token(
            ws,
            TokenCategory::Keyword,
            kind,
            TokenValue::String(text.to_string()),
        )
    }

    pub(crate) fn make_token(
        &self,
        ws: Whitespace,
        category: TokenCategory,
        kind: TokenKind,
        value: TokenValue,
    ) -> Token {
        Token::new(category, kind, ws, self.token_span(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_first(source: &str) -> Token {
        let mut lexer = Lexer::new(source);
        lexer.tokenize_one().unwrap();
        lexer.tokens()[0].clone()
    }

    #[test]
    fn test_plain_identifier() {
        let token = lex_first("counter_2");
        assert_eq!(token.category, TokenCategory::Identifier);
        assert_eq!(token.text(), Some("counter_2"));
    }

    #[test]
    fn test_underscore_identifier() {
        let token = lex_first("_");
        assert_eq!(token.category, TokenCategory::Identifier);
        assert_eq!(token.text(), Some("_"));
    }

    #[test]
    fn test_keywords() {
        assert_eq!(lex_first("func").kind, TokenKind::Func);
        assert_eq!(lex_first("while").kind, TokenKind::While);
        assert_eq!(lex_first("continue").kind, TokenKind::Continue);
        assert_eq!(lex_first("func").category, TokenCategory::Keyword);
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let token = lex_first("iffy");
        assert_eq!(token.category, TokenCategory::Identifier);
        assert_eq!(token.text(), Some("iffy"));
    }

    #[test]
    fn test_boolean_literals() {
        let token = lex_first("true");
        assert_eq!(token.category, TokenCategory::Literal);
        assert_eq!(token.value, TokenValue::Boolean(true));

        let token = lex_first("false");
        assert_eq!(token.value, TokenValue::Boolean(false));
    }

    #[test]
    fn test_nil_literal() {
        let token = lex_first("nil");
        assert_eq!(token.category, TokenCategory::Literal);
        assert_eq!(token.kind, TokenKind::Nil);
    }
}
