//! Statement and declaration productions.
//!
//! Top-down recursive descent. Statements are newline-separated: the
//! whitespace profile of the next peeked token decides whether two
//! statements may follow each other, and a semicolon is rejected
//! outright.

use ifjc_lex::{TokenCategory, TokenKind};
use ifjc_util::DiagResult;

use crate::ast::{
    Argument, AssignmentStatement, Block, BreakStatement, ContinueStatement, ElseClause,
    Expression, ExpressionStatement, ForStatement, FunctionCall, FunctionDeclaration, Identifier,
    IfStatement, InterpolationExpression, OperatorType, Parameter, Pattern, Range,
    ReturnStatement, Statement, Test, TypeReference, VariableDeclaration, VariableDeclarator,
    WhileStatement,
};
use crate::Parser;

/// Keywords that may start a statement; a `return` with no value is
/// followed by one of these, `}` or end of input.
const STATEMENT_HEADS: &[TokenKind] = &[
    TokenKind::Func,
    TokenKind::If,
    TokenKind::While,
    TokenKind::For,
    TokenKind::Return,
    TokenKind::Break,
    TokenKind::Continue,
    TokenKind::Let,
    TokenKind::Var,
];

impl<'a> Parser<'a> {
    /// Parses a statement list, optionally enclosed in braces.
    pub(crate) fn parse_block(&mut self, require_braces: bool) -> DiagResult<Block> {
        if require_braces {
            let token = self.next()?;
            if token.kind != TokenKind::LeftBrace {
                return Err(self.syntax_error(
                    format!("expected '{{' in block body, but got '{}'", token.describe()),
                    &token,
                ));
            }
        }

        let mut statements = Vec::new();

        loop {
            let peek = self.peek(1)?;
            if peek.is_eof() || (require_braces && peek.kind == TokenKind::RightBrace) {
                break;
            }

            let statement = match self.parse_statement()? {
                Some(statement) => statement,
                None => {
                    return Err(self.syntax_error(
                        format!("expected '}}' in block body, but got '{}'", peek.describe()),
                        &peek,
                    ));
                }
            };
            statements.push(statement);

            // Consecutive statements must be separated by a newline.
            let delimiter = self.peek(1)?;
            if delimiter.kind == TokenKind::Semicolon {
                return Err(self.syntax_error(
                    "';' is not supported after statement, use new line instead",
                    &delimiter,
                ));
            }
            if !delimiter.whitespace.has_left_newline() && !delimiter.is_eof() {
                let closes_block = require_braces && delimiter.kind == TokenKind::RightBrace;
                if !closes_block {
                    return Err(
                        self.syntax_error("expected new line after statement", &delimiter)
                    );
                }
            }
        }

        if require_braces {
            let token = self.next()?;
            if token.kind != TokenKind::RightBrace {
                return Err(self.syntax_error(
                    format!("expected '}}' in block body, but got '{}'", token.describe()),
                    &token,
                ));
            }
        }

        Ok(Block::new(statements))
    }

    /// Parses one statement, or returns `None` when the lookahead
    /// cannot start one.
    fn parse_statement(&mut self) -> DiagResult<Option<Statement>> {
        let peek = self.peek(1)?;

        let statement = match peek.kind {
            TokenKind::Func => Statement::FunctionDeclaration(self.parse_func_statement()?),
            TokenKind::If => Statement::If(self.parse_if_statement()?),
            TokenKind::While => Statement::While(self.parse_while_statement()?),
            TokenKind::For => Statement::For(self.parse_for_statement()?),
            TokenKind::Return => Statement::Return(self.parse_return_statement()?),
            TokenKind::Break => Statement::Break(self.parse_break_statement()?),
            TokenKind::Continue => Statement::Continue(self.parse_continue_statement()?),
            TokenKind::Let | TokenKind::Var => {
                Statement::VariableDeclaration(self.parse_variable_declaration_statement()?)
            }
            _ if peek.category == TokenCategory::Identifier => {
                let after = self.peek(2)?;
                match after.kind {
                    TokenKind::Equal => Statement::Assignment(self.parse_assignment_statement()?),
                    TokenKind::LeftParen => {
                        if peek.text() == Some("_") {
                            return Err(self.underscore_error(&peek));
                        }
                        let call = self.parse_function_call_expression()?;
                        Statement::Expression(ExpressionStatement {
                            expression: Expression::FunctionCall(call),
                        })
                    }
                    _ => return Ok(None),
                }
            }
            _ => return Ok(None),
        };

        Ok(Some(statement))
    }

    /// Parses `Ident [ '?' ]` as a type reference.
    pub(crate) fn parse_type_reference(&mut self) -> DiagResult<TypeReference> {
        let token = self.next()?;
        if token.category != TokenCategory::Identifier {
            return Err(self.syntax_error("expected type reference", &token));
        }
        if token.text() == Some("_") {
            return Err(self.underscore_error(&token));
        }

        let mut nullable = false;
        if self.peek(1)?.kind == TokenKind::Question {
            self.next()?;
            nullable = true;
        }

        let name = Identifier::new(token.text().unwrap_or_default());
        Ok(TypeReference::new(name, nullable))
    }

    /// Parses `[ ExtLabel ] IntLabel ':' TypeRef [ '=' Expr ]`.
    fn parse_parameter(&mut self) -> DiagResult<Parameter> {
        let first = self.next()?;
        if first.category != TokenCategory::Identifier {
            return Err(self.syntax_error("expected identifier in function declaration", &first));
        }

        let is_labeless = first.text() == Some("_");
        let mut external_name = None;
        let mut internal_name = Identifier::new(first.text().unwrap_or_default());

        if self.peek(1)?.category == TokenCategory::Identifier {
            let second = self.next()?;
            if !is_labeless {
                external_name = Some(internal_name);
            }
            internal_name = Identifier::new(second.text().unwrap_or_default());
        }

        let colon = self.next()?;
        if colon.kind != TokenKind::Colon {
            return Err(self.syntax_error("expected ':' in function declaration", &colon));
        }

        let type_annotation = self.parse_type_reference()?;

        let mut initializer = None;
        if self.peek(1)?.kind == TokenKind::Equal {
            self.next()?;
            initializer = Some(self.parse_expression()?);
        }

        Ok(Parameter {
            external_name,
            internal_name,
            type_annotation,
            initializer,
            is_labeless,
        })
    }

    /// Parses a parenthesized parameter list.
    fn parse_parameter_list(&mut self) -> DiagResult<Vec<Parameter>> {
        let open = self.next()?;
        if open.kind != TokenKind::LeftParen {
            return Err(
                self.syntax_error("expected '(' in parameter list of function declaration", &open)
            );
        }

        let mut parameters = Vec::new();
        while self.peek(1)?.kind != TokenKind::RightParen {
            parameters.push(self.parse_parameter()?);

            if self.peek(1)?.kind == TokenKind::Comma {
                self.next()?;
            } else if self.peek(1)?.is_eof() {
                let eof = self.peek(1)?;
                return Err(self.syntax_error("expected ')' in function declaration", &eof));
            }
        }
        self.next()?;

        Ok(parameters)
    }

    /// Parses a whole `func` declaration.
    fn parse_func_statement(&mut self) -> DiagResult<FunctionDeclaration> {
        let keyword = self.next()?;
        debug_assert_eq!(keyword.kind, TokenKind::Func);

        let name = self.next()?;
        if name.category != TokenCategory::Identifier {
            return Err(self.syntax_error("expected identifier in function declaration", &name));
        }
        if name.text() == Some("_") {
            return Err(self.underscore_error(&name));
        }

        let parameters = self.parse_parameter_list()?;

        let mut return_type = None;
        if self.peek(1)?.kind == TokenKind::Arrow {
            self.next()?;
            return_type = Some(self.parse_type_reference()?);
        }

        let body = self.parse_block(true)?;

        Ok(FunctionDeclaration {
            name: Identifier::new(name.text().unwrap_or_default()),
            parameters,
            return_type,
            body,
            builtin: crate::ast::BuiltInFunction::None,
        })
    }

    /// Parses `Ident [ ':' TypeRef ]`.
    fn parse_pattern(&mut self) -> DiagResult<Pattern> {
        let token = self.next()?;
        if token.category != TokenCategory::Identifier {
            return Err(self.syntax_error("expected pattern", &token));
        }
        if token.text() == Some("_") {
            return Err(self.underscore_error(&token));
        }

        let mut type_annotation = None;
        if self.peek(1)?.kind == TokenKind::Colon {
            self.next()?;
            type_annotation = Some(self.parse_type_reference()?);
        }

        Ok(Pattern {
            name: Identifier::new(token.text().unwrap_or_default()),
            type_annotation,
        })
    }

    /// Parses the `let name` form of a test condition.
    fn parse_optional_binding_condition(&mut self) -> DiagResult<Test> {
        self.next()?; // 'let'

        let name = self.peek(1)?;
        if name.category != TokenCategory::Identifier {
            return Err(self.syntax_error("'let' must be followed by an identifier", &name));
        }
        if name.text() == Some("_") {
            return Err(self.underscore_error(&name));
        }
        self.next()?;

        Ok(Test::OptionalBinding(crate::ast::OptionalBindingCondition {
            name: Identifier::new(name.text().unwrap_or_default()),
            from_id: 0,
        }))
    }

    /// Parses the test of an `if`/`while`: either an optional binding
    /// or a boolean expression.
    fn parse_test(&mut self) -> DiagResult<Test> {
        let peek = self.peek(1)?;

        if peek.kind == TokenKind::LeftParen {
            let inner = self.peek(2)?;
            if inner.kind == TokenKind::Var {
                return Err(
                    self.syntax_error("cannot use 'var' in optional binding condition", &inner)
                );
            }
            if inner.kind == TokenKind::Let {
                return Err(self.syntax_error(
                    "cannot use optional binding in condition with parentheses",
                    &inner,
                ));
            }
        }

        if peek.kind == TokenKind::Var {
            return Err(self.syntax_error("cannot use 'var' in optional binding condition", &peek));
        }
        if peek.kind == TokenKind::Let {
            return self.parse_optional_binding_condition();
        }

        Ok(Test::Expression(self.parse_expression()?))
    }

    fn parse_if_statement(&mut self) -> DiagResult<IfStatement> {
        let keyword = self.next()?;
        debug_assert_eq!(keyword.kind, TokenKind::If);

        let peek = self.peek(1)?;
        if peek.kind == TokenKind::LeftBrace {
            return Err(self.syntax_error("missing condition in 'if' statement", &peek));
        }
        if peek.kind == TokenKind::Else || peek.is_eof() {
            return Err(
                self.syntax_error("expected expression, var, or let in 'if' condition", &peek)
            );
        }

        let test = self.parse_test()?;
        let body = self.parse_block(true)?;

        let mut alternate = None;
        if self.peek(1)?.kind == TokenKind::Else {
            self.next()?;

            if self.peek(1)?.kind == TokenKind::If {
                alternate = Some(Box::new(ElseClause::If(self.parse_if_statement()?)));
            } else {
                alternate = Some(Box::new(ElseClause::Block(self.parse_block(true)?)));
            }
        }

        Ok(IfStatement {
            test,
            body,
            alternate,
            id: 0,
        })
    }

    fn parse_while_statement(&mut self) -> DiagResult<WhileStatement> {
        let keyword = self.next()?;
        debug_assert_eq!(keyword.kind, TokenKind::While);

        let peek = self.peek(1)?;
        if peek.kind == TokenKind::LeftBrace {
            return Err(self.syntax_error("missing condition in 'while' statement", &peek));
        }
        if peek.is_eof() {
            return Err(
                self.syntax_error("expected expression, var, or let in 'while' condition", &peek)
            );
        }

        let test = self.parse_test()?;
        let body = self.parse_block(true)?;

        Ok(WhileStatement { test, body, id: 0 })
    }

    /// Parses `Expr ('...'|'..<') Expr`.
    fn parse_range(&mut self) -> DiagResult<Range> {
        let start = self.parse_expression()?;

        let operator = self.next()?;
        let operator = match operator.kind {
            TokenKind::Range => OperatorType::Range,
            TokenKind::HalfOpenRange => OperatorType::HalfOpenRange,
            _ => {
                return Err(self.syntax_error("expected '...' or '..<' in range", &operator));
            }
        };

        let end = self.parse_expression()?;

        Ok(Range {
            start,
            end,
            operator,
            end_id: 0,
        })
    }

    fn parse_for_statement(&mut self) -> DiagResult<ForStatement> {
        let keyword = self.next()?;
        debug_assert_eq!(keyword.kind, TokenKind::For);

        let iterator = self.next()?;
        if iterator.category != TokenCategory::Identifier {
            return Err(self.syntax_error("expected identifier in 'for' statement", &iterator));
        }

        let kw_in = self.next()?;
        if kw_in.kind != TokenKind::In {
            return Err(self.syntax_error("expected 'in' in 'for' statement", &kw_in));
        }

        let range = self.parse_range()?;
        let body = self.parse_block(true)?;

        Ok(ForStatement {
            iterator: Identifier::new(iterator.text().unwrap_or_default()),
            range,
            body,
            id: 0,
        })
    }

    fn parse_return_statement(&mut self) -> DiagResult<ReturnStatement> {
        let keyword = self.next()?;
        debug_assert_eq!(keyword.kind, TokenKind::Return);

        let peek = self.peek(1)?;
        let terminates = peek.is_eof()
            || peek.kind == TokenKind::RightBrace
            || STATEMENT_HEADS.contains(&peek.kind);

        let expression = if terminates {
            None
        } else {
            Some(self.parse_expression()?)
        };

        Ok(ReturnStatement { expression, id: 0 })
    }

    fn parse_break_statement(&mut self) -> DiagResult<BreakStatement> {
        let keyword = self.next()?;
        debug_assert_eq!(keyword.kind, TokenKind::Break);
        Ok(BreakStatement { id: 0 })
    }

    fn parse_continue_statement(&mut self) -> DiagResult<ContinueStatement> {
        let keyword = self.next()?;
        debug_assert_eq!(keyword.kind, TokenKind::Continue);
        Ok(ContinueStatement { id: 0 })
    }

    /// Parses `Pattern [ '=' Expr ]`; one of the two must be present.
    fn parse_variable_declarator(&mut self) -> DiagResult<VariableDeclarator> {
        let pattern = self.parse_pattern()?;

        let peek = self.peek(1)?;
        let mut initializer = None;

        if peek.kind == TokenKind::Equal {
            self.next()?;
            initializer = Some(self.parse_expression()?);
        } else if pattern.type_annotation.is_none() {
            return Err(self.syntax_error("type annotation missing in pattern", &peek));
        }

        Ok(VariableDeclarator {
            pattern,
            initializer,
        })
    }

    fn parse_variable_declaration_statement(&mut self) -> DiagResult<VariableDeclaration> {
        let keyword = self.next()?;
        debug_assert!(matches!(keyword.kind, TokenKind::Let | TokenKind::Var));
        let is_constant = keyword.kind == TokenKind::Let;

        let mut declarators = vec![self.parse_variable_declarator()?];
        while self.peek(1)?.kind == TokenKind::Comma {
            self.next()?;
            declarators.push(self.parse_variable_declarator()?);
        }

        Ok(VariableDeclaration {
            declarators,
            is_constant,
        })
    }

    /// Parses `[ Label ':' ] Expr`.
    fn parse_argument(&mut self) -> DiagResult<Argument> {
        let peek = self.peek(1)?;
        let after = self.peek(2)?;

        let mut label = None;
        if peek.category == TokenCategory::Identifier && after.kind == TokenKind::Colon {
            let token = self.next()?;
            label = Some(Identifier::new(token.text().unwrap_or_default()));
            self.next()?; // ':'
        }

        let expression = self.parse_expression()?;

        Ok(Argument { label, expression })
    }

    /// Parses a parenthesized argument list. A trailing comma is a
    /// syntax error.
    fn parse_argument_list(&mut self) -> DiagResult<Vec<Argument>> {
        self.next()?; // '('

        let mut arguments = Vec::new();
        while self.peek(1)?.kind != TokenKind::RightParen {
            arguments.push(self.parse_argument()?);

            if self.peek(1)?.kind == TokenKind::Comma {
                self.next()?;

                let peek = self.peek(1)?;
                if peek.kind == TokenKind::RightParen {
                    return Err(self.syntax_error("expected expression in argument list", &peek));
                }
            } else if self.peek(1)?.is_eof() {
                let eof = self.peek(1)?;
                return Err(self.syntax_error("expected ')' in function call", &eof));
            }
        }
        self.next()?;

        Ok(arguments)
    }

    /// Parses `Ident '(' Args ')'`.
    pub(crate) fn parse_function_call_expression(&mut self) -> DiagResult<FunctionCall> {
        let name = self.next()?;
        if name.category != TokenCategory::Identifier {
            return Err(self.syntax_error("expected identifier in function call", &name));
        }
        if name.text() == Some("_") {
            return Err(self.underscore_error(&name));
        }

        let arguments = self.parse_argument_list()?;

        Ok(FunctionCall {
            name: Identifier::new(name.text().unwrap_or_default()),
            arguments,
        })
    }

    fn parse_assignment_statement(&mut self) -> DiagResult<AssignmentStatement> {
        let target = self.next()?;

        let equal = self.next()?;
        if equal.kind != TokenKind::Equal {
            return Err(self.syntax_error("expected '=' in assignment statement", &equal));
        }

        let expression = self.parse_expression()?;

        Ok(AssignmentStatement {
            target: Identifier::new(target.text().unwrap_or_default()),
            expression,
        })
    }

    /// Parses a lexed interpolation run: STRING, then for each
    /// embedded expression a head marker, the expression, a span/tail
    /// marker and the following STRING piece.
    pub(crate) fn parse_string_interpolation(&mut self) -> DiagResult<InterpolationExpression> {
        let first = self.next()?;
        if first.kind != TokenKind::String {
            return Err(self.syntax_error("expected string in string interpolation", &first));
        }

        let mut strings = vec![first.text().unwrap_or_default().to_string()];
        let mut expressions = Vec::new();

        loop {
            let marker = self.peek(1)?;
            if marker.category != TokenCategory::InterpolationMarker
                || marker.kind == TokenKind::StringTail
            {
                break;
            }

            self.next()?; // head marker
            expressions.push(self.parse_expression()?);

            let closing = self.next()?;
            if closing.category != TokenCategory::InterpolationMarker {
                return Err(self.syntax_error("expected interpolation marker", &closing));
            }

            let piece = self.next()?;
            if piece.kind != TokenKind::String {
                return Err(self.syntax_error("expected string in string interpolation", &piece));
            }
            strings.push(piece.text().unwrap_or_default().to_string());
        }

        Ok(InterpolationExpression {
            strings,
            expressions,
        })
    }

    pub(crate) fn underscore_error(
        &self,
        token: &ifjc_lex::Token,
    ) -> ifjc_util::Diagnostic {
        self.syntax_error(
            "'_' can only appear in a pattern or on the left side of an assignment",
            token,
        )
    }
}
