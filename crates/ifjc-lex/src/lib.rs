//! ifjc-lex - Lexical Analyzer (Lexer/Tokenizer)
//!
//! ============================================================================
//! LEXICAL ANALYSIS THEORY
//! ============================================================================
//!
//! Lexical analysis is the first phase of compilation. It transforms a
//! stream of characters into a stream of tokens.
//!
//! FORMAL DEFINITION:
//! ------------------
//! Let Σ be the alphabet (the set of valid source characters).
//! Let Σ* be the set of all strings over Σ.
//!
//! The lexer is a function:
//!   L: Σ* → T*
//! where T is the set of tokens.
//!
//! PROPERTIES:
//! -----------
//! - Linear time complexity: O(n) where n = input length
//! - Single pass, one character of committed context at a time
//! - Mostly context-free; the one re-entrant construct is string
//!   interpolation (see below)
//!
//! Example:
//! ```text
//! Source: "let x = 42"
//!
//! Lexemes: "let", " ", "x", " ", "=", " ", "42"
//! Tokens:  [Let] [Ident("x")] [Equal] [Integer(42)] [Eof]
//!          ↑ whitespace is skimmed, not emitted
//! ```
//!
//! ============================================================================
//! TOKEN CATEGORIES
//! ============================================================================
//!
//! 1. KEYWORDS
//!    if, else, var, let, while, for, in, func, return, break, continue.
//!
//! 2. IDENTIFIERS
//!    Pattern: [a-zA-Z_][a-zA-Z0-9_]*. The bare `_` lexes as an
//!    identifier; the parser decides where it is legal.
//!
//! 3. LITERALS
//!    - Integer: decimal only (42, 007)
//!    - Floating: 3.14, 1e10, 2.5e-3 (fraction and/or signed exponent)
//!    - String: "text", multi-line """…""", with escapes and \(expr)
//!    - Boolean: true, false
//!    - nil
//!
//! 4. OPERATORS
//!    Arithmetic + - * /, comparison == != < > <= >=, logical ! && ||,
//!    nil-coalescing ??, ranges ... and ..<. Compound assignment and
//!    shift spellings lex but no grammar production accepts them.
//!
//! 5. PUNCTUATORS
//!    ( ) { } [ ] . , : ; -> ? ! and friends.
//!
//! 6. SPECIAL
//!    End-of-input, caret markers for diagnostics, and the string
//!    interpolation head/span/tail markers.
//!
//! ============================================================================
//! IMPLEMENTATION TECHNIQUE
//! ============================================================================
//!
//! The lexer is direct-coded: `next_token`-style dispatch on the first
//! character, with a dedicated routine per lexeme family (identifiers,
//! numbers, strings, comments, the greedy longest-match operator
//! table). Each family lives in its own `impl Lexer` module.
//!
//! ============================================================================
//! WHITESPACE PROFILE
//! ============================================================================
//!
//! Whitespace is never emitted, but every token records what stood
//! immediately to its left and right: a space-like bit and a
//! newline-like bit per side.
//!
//! ```text
//! a /* c */ b      b has LEFT_SPACE   (inline block comment)
//! a // c
//! b                b has LEFT_NEWLINE (line comment eats the line)
//! ```
//!
//! A single-line comment and a block comment spanning more than one
//! line both count as newline; a block comment on one line counts as a
//! space. Block comments nest with a depth counter; an unmatched `*/`
//! and an unterminated `/*` are lexical errors. The parser reads the
//! profile to enforce "consecutive statements must be separated by a
//! newline".
//!
//! ============================================================================
//! STRING INTERPOLATION
//! ============================================================================
//!
//! `\(expr)` inside a string literal re-enters the tokenizer:
//!
//! 1. Emit the accumulated prefix as a STRING token
//! 2. Emit a HEAD marker
//! 3. Tokenize the embedded expression up to the balancing `)`
//!    (the opening `(` counts as depth 1; inner parens are tokenized
//!    and counted normally)
//! 4. Emit a SPAN marker and continue the surrounding string
//! 5. At the closing quote, rewrite the last SPAN marker to TAIL
//!
//! The parser later folds the run STRING HEAD expr SPAN … TAIL STRING
//! back into a single interpolation expression. This is re-entrant
//! tokenization only, not mutual recursion with the parser.
//!
//! ============================================================================
//! TOKEN CACHE
//! ============================================================================
//!
//! All produced tokens are cached by [`TokenStream`] and stay
//! addressable for the whole compilation, so diagnostics can keep
//! markers and the parser can peek at arbitrary positive or negative
//! offsets without regenerating work.

pub mod cursor;
pub mod token;

mod lexer;
mod stream;

pub use lexer::Lexer;
pub use stream::TokenStream;
pub use token::{Token, TokenCategory, TokenKind, TokenValue, Whitespace};
