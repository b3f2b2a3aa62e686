//! Diagnostic model.
//!
//! Every operation that can fail returns a [`Diagnostic`] carrying a
//! kind drawn from the exit-code classes, a severity, a human-readable
//! message and an optional set of marker spans to highlight. The first
//! diagnostic aborts compilation; its kind becomes the process exit
//! code at the driver boundary.

use std::fmt;

use thiserror::Error;

use crate::Span;

/// Classes of compiler failure, numbered by process exit code.
///
/// Several distinct semantic failures share an exit class; the message
/// distinguishes them for the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Malformed lexeme.
    #[error("lexical error")]
    Lexical,
    /// Malformed program structure.
    #[error("syntax error")]
    Syntax,
    /// Call of an undefined function, or a global variable colliding
    /// with a function (and vice versa).
    #[error("undefined function or redefinition")]
    UndefinedFunction,
    /// Wrong arity, label or argument type in a call, or an
    /// incompatible returned value type.
    #[error("invalid call or return type")]
    InvalidCallType,
    /// Use of an undefined or uninitialized variable.
    #[error("undefined or uninitialized variable")]
    UndefinedVariable,
    /// Missing or extraneous expression in a return statement.
    #[error("invalid return")]
    InvalidReturn,
    /// Type incompatibility in arithmetic, string or relational
    /// expressions.
    #[error("type incompatibility")]
    TypeIncompatibility,
    /// A type is neither annotated nor inferable.
    #[error("type inference failure")]
    InferenceFailure,
    /// Other semantic errors (ambiguous overload, assignment to a
    /// constant, duplicate parameter, bad label).
    #[error("semantic error")]
    OtherSemantic,
    /// Internal compiler error, independent of the input program.
    #[error("internal compiler error")]
    Internal,
}

impl ErrorKind {
    /// Returns the process exit code for this error class.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Lexical => 1,
            ErrorKind::Syntax => 2,
            ErrorKind::UndefinedFunction => 3,
            ErrorKind::InvalidCallType => 4,
            ErrorKind::UndefinedVariable => 5,
            ErrorKind::InvalidReturn => 6,
            ErrorKind::TypeIncompatibility => 7,
            ErrorKind::InferenceFailure => 8,
            ErrorKind::OtherSemantic => 9,
            ErrorKind::Internal => 99,
        }
    }
}

/// Diagnostic severity. Only [`Severity::Error`] propagates; the other
/// levels exist for message formatting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A single fatal diagnostic.
///
/// # Examples
///
/// ```
/// use ifjc_util::{Diagnostic, ErrorKind, Span};
///
/// let diag = Diagnostic::error(ErrorKind::Lexical, "unterminated string literal")
///     .with_marker(Span::new(4, 5, 1, 5));
/// assert_eq!(diag.kind.exit_code(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Error class, determining the exit code.
    pub kind: ErrorKind,
    /// Severity level.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Source ranges to highlight.
    pub markers: Vec<Span>,
    /// Additional context lines.
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates an error diagnostic of the given kind.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            markers: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Attaches a marker span to highlight.
    pub fn with_marker(mut self, span: Span) -> Self {
        self.markers.push(span);
        self
    }

    /// Attaches a context note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Returns the primary marker, if any.
    pub fn primary_marker(&self) -> Option<Span> {
        self.markers.first().copied()
    }
}

impl std::error::Error for Diagnostic {}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;

        if let Some(span) = self.primary_marker() {
            if span.line != 0 {
                write!(f, "\n --> {}:{}", span.line, span.column)?;
            }
        }

        for note in &self.notes {
            write!(f, "\nnote: {}", note)?;
        }

        Ok(())
    }
}
