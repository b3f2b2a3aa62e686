//! ifjc-util - Core Utilities and Foundation Types
//!
//! ============================================================================
//! MODULE OVERVIEW
//! ============================================================================
//!
//! This crate provides the foundation types shared by every phase of the
//! ifjc compiler: source spans for location tracking and the diagnostic
//! model that carries an exit-code class from the failing phase up to the
//! driver boundary.
//!
//! DESIGN PRINCIPLES:
//! ------------------
//! 1. ERRORS ARE VALUES
//!    Every fallible operation returns `Result<T, Diagnostic>`. Nothing
//!    panics on bad input; nothing is thrown. Each caller inspects the
//!    result and either continues with the payload or hands the same
//!    diagnostic upward with `?`.
//!
//! 2. FIRST ERROR WINS
//!    Compilation aborts on the first diagnostic. There is no recovery,
//!    no partial success and no warning channel that reaches the process
//!    boundary.
//!
//! 3. EXIT CODES ARE PART OF THE CONTRACT
//!    A diagnostic's kind is not free-form: it is one of the numbered
//!    error classes the interpreter toolchain expects, and the driver
//!    turns it into the process exit code unchanged.
//!
//! 4. CHEAP, COPYABLE LOCATIONS
//!    A span is four plain integers. Tokens, diagnostics and tests can
//!    copy them freely without lifetime plumbing.
//!
//! ============================================================================
//! SOURCE LOCATION TRACKING
//! ============================================================================
//!
//! FORMAL DEFINITION:
//! ------------------
//! Let B be the source buffer, a byte sequence b0 b1 ... bn-1.
//!
//! A span is a half-open interval [start, end) over B together with the
//! 1-based (line, column) of its start:
//!
//!   Span = (start, end, line, column),  0 <= start <= end <= n
//!
//! PROPERTIES:
//! -----------
//! - len(s) = end - start (bytes, not characters)
//! - Token spans never overlap and appear in source order
//! - For a fully lexed valid input, the spans plus the skipped
//!   whitespace and comments tile the whole buffer
//!
//! Example:
//! ```text
//! Source: "let x = 42"
//!          0123456789
//!
//! Token 'let': Span { start: 0, end: 3,  line: 1, column: 1 }
//! Token 'x':   Span { start: 4, end: 5,  line: 1, column: 5 }
//! Token '42':  Span { start: 8, end: 10, line: 1, column: 9 }
//! ```
//!
//! ============================================================================
//! DIAGNOSTIC MODEL
//! ============================================================================
//!
//! A diagnostic carries: a kind (the exit-code class), a severity, a
//! human-readable message, and optional marker spans to highlight.
//! Severity `Error` is the only propagating severity; the other levels
//! exist for message formatting.
//!
//! EXIT CODE CLASSES:
//! ------------------
//! ```text
//! 1   lexical error (malformed lexeme)
//! 2   syntax error (malformed program structure)
//! 3   undefined function / redefinition
//! 4   call arity, label or argument type mismatch; bad return type
//! 5   use of an undefined or uninitialized variable
//! 6   missing or extraneous expression in return
//! 7   type incompatibility in arithmetic, string, relational exprs
//! 8   type inference failure
//! 9   other semantic errors (ambiguity, constant assignment, labels)
//! 99  internal compiler error
//! ```
//!
//! Several distinct semantic failures deliberately share an exit class;
//! the message text distinguishes them for the user.

pub mod diagnostic;
pub mod span;

pub use diagnostic::{Diagnostic, ErrorKind, Severity};
pub use span::Span;

/// Convenience alias used by every fallible compiler operation.
///
/// Diagnostics are values, never panics: each caller inspects the
/// result and either continues with the payload or hands the same
/// diagnostic upward.
pub type DiagResult<T> = Result<T, Diagnostic>;
