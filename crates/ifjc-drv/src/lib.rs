//! ifjc-drv - Compiler Driver
//!
//! ============================================================================
//! COMPILER DRIVER OVERVIEW
//! ============================================================================
//!
//! The driver is the entry point and orchestrator for the whole
//! compilation pipeline. It is responsible for:
//!
//! 1. INPUT
//!    One source text, UTF-8, read from standard input until
//!    end-of-stream. No command-line flags, no environment variables.
//!
//! 2. PIPELINE ORCHESTRATION
//!    Run the phases in order and stop at the first diagnostic.
//!
//! 3. ERROR REPORTING
//!    Format the diagnostic to standard error and exit with its
//!    kind's numeric code.
//!
//! ============================================================================
//! COMPILATION PIPELINE
//! ============================================================================
//!
//! ```text
//! Source text (stdin)
//!        │
//!        ▼
//!   [Lexer] ──▶ Token stream          (ifjc-lex)
//!        │
//!        ▼
//!   [Parser] ──▶ AST                  (ifjc-par)
//!        │
//!        ▼
//!   [Semantic Analysis] ──▶ annotated AST + declaration tables
//!        │                            (ifjc-sem)
//!        ▼
//!   [Code Generation] ──▶ IFJcode23 assembly (stdout)
//!        │                            (ifjc-gen)
//!        ▼
//!   exit code 0
//! ```
//!
//! Control flows strictly linearly; there is no incremental
//! compilation and no second compilation unit. A compilation either
//! completes end-to-end or aborts on the first error.
//!
//! ============================================================================
//! ERROR HANDLING
//! ============================================================================
//!
//! Exit codes:
//! -----------
//! ```text
//! 0      success, assembly on stdout
//! 1..9   lexical / syntax / semantic error classes
//! 99     internal compiler error
//! ```
//!
//! The diagnostic's message is written to stderr as
//! `error: <message>` with a `--> line:column` location when a marker
//! is present.

use ifjc_gen::Codegen;
use ifjc_par::Parser;
use ifjc_sem::Analyser;
use ifjc_util::DiagResult;

/// Compiles one source text to IFJcode23 assembly.
///
/// # Examples
///
/// ```
/// let assembly = ifjc_drv::compile("write(\"hello\")").unwrap();
/// assert!(assembly.starts_with(".IFJcode23"));
/// ```
pub fn compile(source: &str) -> DiagResult<String> {
    let mut program = Parser::new(source).parse()?;

    let mut analyser = Analyser::new();
    analyser.analyse(&mut program)?;

    Ok(Codegen::new(&analyser).generate(&program))
}
