//! Property tests for the tokenizer.

use ifjc_lex::{Lexer, Token, TokenValue};
use proptest::prelude::*;

fn tokenize(source: &str) -> Result<Vec<Token>, ifjc_util::Diagnostic> {
    let mut lexer = Lexer::new(source);
    lexer.tokenize_all().map(|tokens| tokens.to_vec())
}

/// Token equality modulo nothing: spans, kinds and values must all
/// match between two runs over the same input.
fn assert_same_tokens(a: &[Token], b: &[Token]) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.kind, y.kind);
        assert_eq!(x.category, y.category);
        assert_eq!(x.span, y.span);
        assert_eq!(x.value, y.value);
        assert_eq!(x.whitespace, y.whitespace);
    }
}

proptest! {
    /// Tokenizing twice yields identical token sequences.
    #[test]
    fn lexer_is_deterministic(source in "[ -~\n\t]{0,120}") {
        let first = tokenize(&source);
        let second = tokenize(&source);

        match (first, second) {
            (Ok(a), Ok(b)) => assert_same_tokens(&a, &b),
            (Err(a), Err(b)) => prop_assert_eq!(a.kind, b.kind),
            _ => prop_assert!(false, "runs disagreed on success"),
        }
    }

    /// For accepted inputs, token spans tile the source: every byte
    /// is covered by exactly one token span or by whitespace.
    #[test]
    fn token_spans_are_disjoint_and_ordered(
        source in "[a-z0-9+*/=<>(){},: \n]{0,80}"
    ) {
        if let Ok(tokens) = tokenize(&source) {
            let mut last_end = 0usize;
            for token in &tokens {
                prop_assert!(token.span.start >= last_end);
                prop_assert!(token.span.end <= source.len());
                last_end = token.span.end;
            }
        }
    }

    /// Comment nesting: N opens followed by N closes is accepted,
    /// one close short is unterminated, one close extra is unmatched.
    #[test]
    fn comment_nesting(n in 1usize..20) {
        let balanced = format!("{}{}x", "/*".repeat(n), "*/".repeat(n));
        prop_assert!(tokenize(&balanced).is_ok());

        let unterminated = format!("{}{}x", "/*".repeat(n), "*/".repeat(n - 1));
        let err = tokenize(&unterminated).unwrap_err();
        prop_assert!(err.message.contains("unterminated"));

        let unmatched = format!("{}{}x", "/*".repeat(n - 1), "*/".repeat(n));
        let err = tokenize(&unmatched).unwrap_err();
        prop_assert!(err.message.contains("unexpected end of block comment"));
    }

    /// Integer literals round-trip through the lexer.
    #[test]
    fn integer_literals_round_trip(value in 0i64..i64::MAX) {
        let source = value.to_string();
        let tokens = tokenize(&source).unwrap();
        prop_assert_eq!(tokens.len(), 2);
        prop_assert_eq!(&tokens[0].value, &TokenValue::Integer(value));
    }

    /// Escape-free string literals decode to their own content.
    #[test]
    fn plain_strings_round_trip(content in "[a-zA-Z0-9 .,!?]{0,40}") {
        let source = format!("\"{}\"", content);
        let tokens = tokenize(&source).unwrap();
        prop_assert_eq!(tokens[0].text(), Some(content.as_str()));
    }
}
