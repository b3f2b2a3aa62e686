//! Operator and punctuator lexing.
//!
//! The table is ordered from longest lexeme to shortest and scanned
//! greedily, so `...` wins over `..<`'s prefix `..` and both win over
//! `.`, and `==` wins over two `=`.

use ifjc_util::DiagResult;

use crate::token::{TokenCategory, TokenKind, TokenValue, Whitespace};
use crate::Lexer;

use crate::token::TokenCategory::{Operator, Punctuator};
use crate::token::TokenKind::*;

/// Fixed lexemes, longest first.
const OPERATOR_TABLE: &[(&str, TokenCategory, TokenKind)] = &[
    ("<<=", Operator, LeftShiftAssign),
    (">>=", Operator, RightShiftAssign),
    ("...", Operator, Range),
    ("..<", Operator, HalfOpenRange),
    ("&&", Operator, LogAnd),
    ("||", Operator, LogOr),
    ("??", Operator, NullCoalescing),
    ("==", Operator, Equality),
    ("!=", Operator, NotEquality),
    (">=", Operator, GreaterEqual),
    ("<=", Operator, LessEqual),
    ("+=", Operator, PlusAssign),
    ("-=", Operator, MinusAssign),
    ("*=", Operator, MultAssign),
    ("/=", Operator, DivAssign),
    ("%=", Operator, ModAssign),
    ("<<", Operator, LeftShift),
    (">>", Operator, RightShift),
    ("->", Punctuator, Arrow),
    ("=", Operator, Equal),
    (">", Operator, Greater),
    ("<", Operator, Less),
    ("+", Operator, Plus),
    ("-", Operator, Minus),
    ("*", Operator, Star),
    ("/", Operator, Slash),
    ("%", Operator, Percent),
    ("&", Operator, Ampersand),
    ("|", Operator, Pipe),
    ("^", Operator, Caret),
    ("~", Operator, Tilde),
    ("(", Punctuator, LeftParen),
    (")", Punctuator, RightParen),
    ("{", Punctuator, LeftBrace),
    ("}", Punctuator, RightBrace),
    ("[", Punctuator, LeftBracket),
    ("]", Punctuator, RightBracket),
    (".", Punctuator, Dot),
    (",", Punctuator, Comma),
    (":", Punctuator, Colon),
    (";", Punctuator, Semicolon),
    ("@", Punctuator, At),
    ("?", Punctuator, Question),
    ("!", Punctuator, Exclamation),
];

impl<'a> Lexer<'a> {
    /// Tries to lex an operator or punctuator. Returns false when
    /// nothing in the table matches.
    pub(crate) fn lex_operator(&mut self, ws: Whitespace) -> DiagResult<bool> {
        for &(lexeme, category, kind) in OPERATOR_TABLE {
            if self.cursor.match_str(lexeme) {
                let token = self.make_token(ws, category, kind, TokenValue::None);
                self.push_token(token);
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        lexer
            .tokenize_all()
            .unwrap()
            .iter()
            .filter(|t| !t.is_eof())
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_longest_match() {
        assert_eq!(kinds("=="), vec![Equality]);
        assert_eq!(kinds("= ="), vec![Equal, Equal]);
        assert_eq!(kinds("??"), vec![NullCoalescing]);
        assert_eq!(kinds("? ?"), vec![Question, Question]);
    }

    #[test]
    fn test_range_operators() {
        assert_eq!(kinds("..."), vec![Range]);
        assert_eq!(kinds("..<"), vec![HalfOpenRange]);
    }

    #[test]
    fn test_arrow() {
        assert_eq!(kinds("->"), vec![Arrow]);
        assert_eq!(kinds("- >"), vec![Minus, Greater]);
    }

    #[test]
    fn test_categories() {
        let mut lexer = Lexer::new("+ (");
        let tokens = lexer.tokenize_all().unwrap();
        assert_eq!(tokens[0].category, TokenCategory::Operator);
        assert_eq!(tokens[1].category, TokenCategory::Punctuator);
    }

    #[test]
    fn test_compound_assignment_lexes() {
        // These kinds lex so the parser can reject them with a proper
        // syntax error instead of a lexical one.
        assert_eq!(kinds("+="), vec![PlusAssign]);
        assert_eq!(kinds("<<="), vec![LeftShiftAssign]);
    }
}
