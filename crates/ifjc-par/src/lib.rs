//! ifjc-par - Parser (Syntactic Analyzer)
//!
//! ============================================================================
//! PARSING THEORY
//! ============================================================================
//!
//! Parsing analyzes a token sequence to determine its grammatical
//! structure according to a formal grammar. The output is an Abstract
//! Syntax Tree (AST).
//!
//! FORMAL DEFINITION:
//! ------------------
//! Given:
//! - G = (N, T, P, S) where
//!   N = non-terminal symbols
//!   T = terminal symbols (tokens)
//!   P = production rules
//!   S = start symbol
//!
//! Parsing finds a derivation S ⇒* w where w is the input token
//! sequence, or reports the first point where none exists.
//!
//! GRAMMAR SKETCH (EBNF):
//! ----------------------
//! ```ebnf
//! Program      = Block(no-braces) ;
//! Block        = [ "{" ] { Statement } [ "}" ] ;
//! Statement    = FuncDecl | IfStmt | WhileStmt | ForStmt
//!              | ReturnStmt | BreakStmt | ContinueStmt
//!              | VarDecl | AssignStmt | CallStmt ;
//! VarDecl      = ( "let" | "var" ) Declarator { "," Declarator } ;
//! Declarator   = Ident [ ":" TypeRef ] [ "=" Expr ] ;
//! TypeRef      = Ident [ "?" ] ;
//! FuncDecl     = "func" Ident "(" [ Params ] ")" [ "->" TypeRef ] Block ;
//! Param        = [ ExtLabel ] IntLabel ":" TypeRef [ "=" Expr ] ;
//! IfStmt       = "if" Test Block [ "else" ( IfStmt | Block ) ] ;
//! Test         = "let" Ident | Expr ;
//! WhileStmt    = "while" Test Block ;
//! ForStmt      = "for" Ident "in" Expr ( "..." | "..<" ) Expr Block ;
//! AssignStmt   = Ident "=" Expr ;
//! ```
//!
//! Statements are whitespace-sensitive in exactly one way: two
//! statements on the same line are rejected, and a semicolon is a
//! syntax error. The whitespace profile on the next peeked token
//! drives this check.
//!
//! ============================================================================
//! PARSING ALGORITHMS
//! ============================================================================
//!
//! ALGORITHM 1: RECURSIVE DESCENT (statements)
//! -------------------------------------------
//! Each non-terminal has a corresponding function. A production that
//! does not match either returns a no-match (the caller may try
//! another) or a diagnostic (the first error aborts).
//!
//! ```text
//! parse_func_statement() {
//!     expect(Func);
//!     name = expect_identifier();
//!     params = parse_parameter_list();
//!     ret = optional("->" parse_type_reference);
//!     body = parse_block(braces);
//! }
//! ```
//!
//! ALGORITHM 2: OPERATOR PRECEDENCE (expressions)
//! ----------------------------------------------
//! A shift/reduce automaton over a table indexed by precedence class:
//!
//! ```text
//! TABLE[stack-top terminal][input terminal] ∈ { Shift, Reduce,
//!                                               Equal, Error }
//! ```
//!
//! The stack holds four item flavours: bottom sentinel, reduction
//! boundary marker, terminal, non-terminal. Shift inserts a marker
//! after the topmost terminal and pushes the input; Reduce pops the
//! handle back to the marker and applies one of the rules
//!
//! ```text
//! E → i      E → E!      E → !E      E → (E)      E → E op E
//! ```
//!
//! Equal pushes without a marker (only `(` meeting `)`). An Error
//! entry with the stack at `$ E` is the accept state: the lookahead
//! cannot extend the expression and is left unconsumed.
//!
//! Function calls are recognized at `identifier (` and parsed through
//! the statement parser's argument production into a single `i`
//! handle, as is a lexed interpolation run.
//!
//! ============================================================================
//! ABSTRACT SYNTAX TREE
//! ============================================================================
//!
//! The AST is a closed sum type: one Rust enum/struct per node shape,
//! pattern-matched rather than down-cast. Concrete syntax (parens,
//! braces, commas) is gone; what remains is the semantic structure:
//!
//! ```text
//! Source: (a + b) * c
//!
//! AST:
//!   Binary(*)
//!   ├── Binary(+)
//!   │   ├── Identifier("a")
//!   │   └── Identifier("b")
//!   └── Identifier("c")
//! ```
//!
//! Nodes carry annotation slots (ids, resolved types, literal
//! original-value pairs) that stay empty until the semantic analyser
//! fills them in place.
//!
//! ============================================================================
//! ERROR HANDLING
//! ============================================================================
//!
//! No recovery is attempted: every production that fails pins a
//! diagnostic to the offending token and the first error aborts
//! parsing. Both parsers share one cached [`TokenStream`], so the
//! statement parser can peek past the expression parser's stopping
//! point and whitespace profiles stay available for the
//! statement-termination rule.

pub mod ast;

mod expr;
mod stmt;

use ifjc_lex::{Token, TokenStream};
use ifjc_util::{DiagResult, Diagnostic, ErrorKind};

use crate::ast::Program;

/// Recursive-descent parser over a cached token stream.
pub struct Parser<'a> {
    stream: TokenStream<'a>,
}

impl<'a> Parser<'a> {
    /// Creates a parser for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            stream: TokenStream::new(source),
        }
    }

    /// Parses a whole program: a brace-less top-level block running to
    /// the end of input.
    pub fn parse(&mut self) -> DiagResult<Program> {
        let block = self.parse_block(false)?;
        Ok(Program { block })
    }

    /// Consumes and returns the next token.
    pub(crate) fn next(&mut self) -> DiagResult<Token> {
        self.stream.next()
    }

    /// Peeks `offset` tokens ahead (1 = next unconsumed).
    pub(crate) fn peek(&mut self, offset: isize) -> DiagResult<Token> {
        self.stream.peek(offset)
    }

    /// Builds a syntax-error diagnostic pinned to the given token.
    pub(crate) fn syntax_error(&self, message: impl Into<String>, token: &Token) -> Diagnostic {
        Diagnostic::error(ErrorKind::Syntax, message).with_marker(token.span)
    }
}
