//! Operator-precedence expression parser.
//!
//! A shift/reduce automaton over a table indexed by precedence class.
//! The stack holds four item flavours: the bottom sentinel, a stop
//! marker delimiting reduction handles, terminals (tokens) and
//! nonterminals (finished expression nodes). Shift inserts a stop
//! marker after the topmost terminal and pushes the input; Reduce
//! pops the handle back to the marker and applies one of the
//! reduction rules; Equal pushes without a marker (only `(` against
//! `)`). An Error entry with the stack at `$ E` is the accept state:
//! the lookahead cannot extend the expression and is left unconsumed.
//!
//! Function calls are recognized when an identifier is followed by
//! `(`: the whole call is parsed through the statement parser's
//! argument production and enters the automaton as a single `i`
//! handle, as does a string literal followed by an interpolation
//! head marker.

use ifjc_lex::{Token, TokenCategory, TokenKind};
use ifjc_util::DiagResult;

use crate::ast::{
    BinaryExpression, Expression, LiteralExpression, LiteralValue, OperatorType, UnaryExpression,
    ValueType,
};
use crate::Parser;

/// Terminal classes of the precedence table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PrecClass {
    /// `+` `-`
    Additive = 0,
    /// `*` `/`
    Multiplicative,
    /// Postfix `!`
    Unwrap,
    /// `??`
    NilCoalescing,
    /// `==` `!=` `<` `>` `<=` `>=`
    Relational,
    /// Prefix `!`
    Not,
    /// `&&`
    And,
    /// `||`
    Or,
    /// Identifier, literal, call, interpolation
    Term,
    LeftParen,
    RightParen,
    /// Anything that cannot extend an expression
    Dollar,
}

/// Table actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    /// Shift the input after a stop marker.
    S,
    /// Reduce the topmost handle.
    R,
    /// Shift without a marker (`(` meeting `)`).
    E,
    /// No relation: accept if the stack is `$ E`, else error.
    X,
}

use self::Action::{E, R, S, X};

/// `TABLE[stack-top terminal][input terminal]`.
#[rustfmt::skip]
const TABLE: [[Action; 12]; 12] = [
    //         +-  */  x!  ??  rel  !x  &&  ||   i   (   )   $
    /* +- */ [ R,  S,  S,  R,  R,   S,  R,  R,   S,  S,  R,  R ],
    /* "*" "/" */ [ R,  R,  S,  R,  R,   S,  R,  R,   S,  S,  R,  R ],
    /* x! */ [ R,  R,  R,  R,  R,   R,  R,  R,   X,  X,  R,  R ],
    /* ?? */ [ S,  S,  S,  S,  S,   S,  R,  R,   S,  S,  R,  R ],
    /* rel*/ [ S,  S,  S,  R,  R,   S,  R,  R,   S,  S,  R,  R ],
    /* !x */ [ R,  R,  S,  R,  R,   S,  R,  R,   S,  S,  R,  R ],
    /* && */ [ S,  S,  S,  S,  S,   S,  R,  R,   S,  S,  R,  R ],
    /* || */ [ S,  S,  S,  S,  S,   S,  S,  R,   S,  S,  R,  R ],
    /* i  */ [ R,  R,  R,  R,  R,   R,  R,  R,   X,  X,  R,  R ],
    /* (  */ [ S,  S,  S,  S,  S,   S,  S,  S,   S,  S,  E,  X ],
    /* )  */ [ R,  R,  R,  R,  R,   R,  R,  R,   X,  X,  R,  R ],
    /* $  */ [ S,  S,  S,  S,  S,   S,  S,  S,   S,  S,  X,  X ],
];

/// Parse stack items.
#[derive(Debug)]
enum StackItem {
    /// Bottom sentinel (`$`).
    Bottom,
    /// Reduction boundary marker.
    Stop,
    /// A shifted terminal; `node` carries a preparsed call or
    /// interpolation standing in for a plain `i`.
    Terminal {
        class: PrecClass,
        token: Token,
        node: Option<Expression>,
    },
    /// A finished sub-expression.
    Nonterminal(Expression),
}

impl<'a> Parser<'a> {
    /// Parses one expression, leaving the terminating token
    /// unconsumed.
    pub(crate) fn parse_expression(&mut self) -> DiagResult<Expression> {
        let mut stack: Vec<StackItem> = vec![StackItem::Bottom];

        loop {
            let current = self.peek(1)?;
            let class = classify(&current, &stack);
            let top = top_terminal_class(&stack);

            match TABLE[top as usize][class as usize] {
                S => {
                    let item = self.shift_item(current, class)?;
                    push_stop_after_top_terminal(&mut stack);
                    stack.push(item);
                }
                E => {
                    self.next()?;
                    stack.push(StackItem::Terminal {
                        class,
                        token: current,
                        node: None,
                    });
                }
                R => {
                    if !reduce(&mut stack) {
                        return Err(self.syntax_error("syntax error in expression", &current));
                    }
                }
                X => {
                    if stack.len() == 2 && matches!(stack[1], StackItem::Nonterminal(_)) {
                        if let Some(StackItem::Nonterminal(expression)) = stack.pop() {
                            return Ok(expression);
                        }
                    }
                    return Err(self.syntax_error(
                        format!("unexpected token '{}' in expression", current.describe()),
                        &current,
                    ));
                }
            }
        }
    }

    /// Consumes the input for a shift. An identifier directly
    /// followed by `(` becomes a preparsed function call; a string
    /// followed by a head marker becomes a preparsed interpolation.
    fn shift_item(&mut self, current: Token, class: PrecClass) -> DiagResult<StackItem> {
        if class == PrecClass::Term {
            if current.category == TokenCategory::Identifier {
                let after = self.peek(2)?;
                if after.kind == TokenKind::LeftParen && !after.whitespace.has_left_newline() {
                    let call = self.parse_function_call_expression()?;
                    return Ok(StackItem::Terminal {
                        class,
                        token: current,
                        node: Some(Expression::FunctionCall(call)),
                    });
                }
            }

            if current.kind == TokenKind::String {
                let after = self.peek(2)?;
                if after.kind == TokenKind::StringHead {
                    let interpolation = self.parse_string_interpolation()?;
                    return Ok(StackItem::Terminal {
                        class,
                        token: current,
                        node: Some(Expression::Interpolation(interpolation)),
                    });
                }
            }
        }

        self.next()?;
        Ok(StackItem::Terminal {
            class,
            token: current,
            node: None,
        })
    }
}

/// Maps a token to its precedence class. The `!` token is postfix
/// unwrap when a finished operand sits on the stack top and a prefix
/// negation otherwise. An operand or `(` on a new line after a
/// complete expression is a statement start, not a continuation, so
/// it classifies as `$`.
fn classify(token: &Token, stack: &[StackItem]) -> PrecClass {
    let class = classify_kind(token, stack);

    if matches!(class, PrecClass::Term | PrecClass::LeftParen)
        && token.whitespace.has_left_newline()
        && operand_on_top(stack)
    {
        return PrecClass::Dollar;
    }

    class
}

fn classify_kind(token: &Token, stack: &[StackItem]) -> PrecClass {
    match token.kind {
        TokenKind::Plus | TokenKind::Minus => PrecClass::Additive,
        TokenKind::Star | TokenKind::Slash => PrecClass::Multiplicative,
        TokenKind::Exclamation => {
            if operand_on_top(stack) {
                PrecClass::Unwrap
            } else {
                PrecClass::Not
            }
        }
        TokenKind::NullCoalescing => PrecClass::NilCoalescing,
        TokenKind::Equality
        | TokenKind::NotEquality
        | TokenKind::Less
        | TokenKind::Greater
        | TokenKind::LessEqual
        | TokenKind::GreaterEqual => PrecClass::Relational,
        TokenKind::LogAnd => PrecClass::And,
        TokenKind::LogOr => PrecClass::Or,
        TokenKind::LeftParen => PrecClass::LeftParen,
        TokenKind::RightParen => PrecClass::RightParen,
        _ => match token.category {
            TokenCategory::Identifier | TokenCategory::Literal => PrecClass::Term,
            _ => PrecClass::Dollar,
        },
    }
}

/// True when the stack top is a finished expression or a terminal
/// that itself ends one. In that state a `!` is postfix and a
/// newline-separated operand belongs to the next statement.
fn operand_on_top(stack: &[StackItem]) -> bool {
    match stack.last() {
        Some(StackItem::Nonterminal(_)) => true,
        Some(StackItem::Terminal { class, .. }) => matches!(
            class,
            PrecClass::Term | PrecClass::RightParen | PrecClass::Unwrap
        ),
        _ => false,
    }
}

/// Returns the class of the topmost terminal, or `$` at the bottom.
fn top_terminal_class(stack: &[StackItem]) -> PrecClass {
    for item in stack.iter().rev() {
        match item {
            StackItem::Terminal { class, .. } => return *class,
            StackItem::Bottom => return PrecClass::Dollar,
            _ => {}
        }
    }
    PrecClass::Dollar
}

/// Inserts a stop marker directly above the topmost terminal.
fn push_stop_after_top_terminal(stack: &mut Vec<StackItem>) {
    for index in (0..stack.len()).rev() {
        if matches!(
            stack[index],
            StackItem::Terminal { .. } | StackItem::Bottom
        ) {
            stack.insert(index + 1, StackItem::Stop);
            return;
        }
    }
}

/// Pops the topmost handle and applies a reduction rule. Returns
/// false when no rule matches.
fn reduce(stack: &mut Vec<StackItem>) -> bool {
    let mut handle = Vec::new();

    loop {
        match stack.pop() {
            Some(StackItem::Stop) => break,
            Some(StackItem::Bottom) | None => return false,
            Some(item) => handle.push(item),
        }
    }
    handle.reverse();

    let node = match apply_reduction(handle) {
        Some(node) => node,
        None => return false,
    };

    stack.push(StackItem::Nonterminal(node));
    true
}

/// The reduction rules: `E → i`, `E → E!`, `E → !E`, `E → (E)`,
/// `E → E op E`.
fn apply_reduction(mut handle: Vec<StackItem>) -> Option<Expression> {
    match handle.len() {
        // E → i
        1 => match handle.pop()? {
            StackItem::Terminal {
                node: Some(node), ..
            } => Some(node),
            StackItem::Terminal { token, .. } => term_to_expression(&token),
            _ => None,
        },

        // E → E!  |  E → !E
        2 => {
            let second = handle.pop()?;
            let first = handle.pop()?;
            match (first, second) {
                (
                    StackItem::Nonterminal(argument),
                    StackItem::Terminal {
                        class: PrecClass::Unwrap,
                        ..
                    },
                ) => Some(Expression::Unary(UnaryExpression {
                    argument: Box::new(argument),
                    operator: OperatorType::Unwrap,
                    is_prefix: false,
                    ty: ValueType::UNKNOWN,
                })),
                (
                    StackItem::Terminal {
                        class: PrecClass::Not,
                        ..
                    },
                    StackItem::Nonterminal(argument),
                ) => Some(Expression::Unary(UnaryExpression {
                    argument: Box::new(argument),
                    operator: OperatorType::Not,
                    is_prefix: true,
                    ty: ValueType::UNKNOWN,
                })),
                _ => None,
            }
        }

        // E → (E)  |  E → E op E
        3 => {
            let third = handle.pop()?;
            let second = handle.pop()?;
            let first = handle.pop()?;
            match (first, second, third) {
                (
                    StackItem::Terminal {
                        class: PrecClass::LeftParen,
                        ..
                    },
                    StackItem::Nonterminal(inner),
                    StackItem::Terminal {
                        class: PrecClass::RightParen,
                        ..
                    },
                ) => Some(inner),
                (
                    StackItem::Nonterminal(left),
                    StackItem::Terminal { token, node: None, .. },
                    StackItem::Nonterminal(right),
                ) => {
                    let operator = binary_operator(token.kind)?;
                    Some(Expression::Binary(BinaryExpression {
                        left: Box::new(left),
                        right: Box::new(right),
                        operator,
                        ty: ValueType::UNKNOWN,
                    }))
                }
                _ => None,
            }
        }

        _ => None,
    }
}

/// Builds the `E → i` node for a plain literal or identifier token.
fn term_to_expression(token: &Token) -> Option<Expression> {
    match token.category {
        TokenCategory::Identifier => Some(Expression::Identifier(crate::ast::Identifier::new(
            token.text()?,
        ))),
        TokenCategory::Literal => {
            let (ty, value) = match (&token.value, token.kind) {
                (ifjc_lex::TokenValue::Integer(v), _) => {
                    (ValueType::INT, LiteralValue::Integer(*v))
                }
                (ifjc_lex::TokenValue::Floating(v), _) => {
                    (ValueType::DOUBLE, LiteralValue::Floating(*v))
                }
                (ifjc_lex::TokenValue::Boolean(v), _) => {
                    (ValueType::BOOL, LiteralValue::Boolean(*v))
                }
                (ifjc_lex::TokenValue::String(v), _) => {
                    (ValueType::STRING, LiteralValue::String(v.clone()))
                }
                (ifjc_lex::TokenValue::None, TokenKind::Nil) => {
                    (ValueType::NIL, LiteralValue::Nil)
                }
                _ => return None,
            };
            Some(Expression::Literal(LiteralExpression::new(ty, value)))
        }
        _ => None,
    }
}

/// Maps a binary operator token to the AST operator.
fn binary_operator(kind: TokenKind) -> Option<OperatorType> {
    match kind {
        TokenKind::Plus => Some(OperatorType::Plus),
        TokenKind::Minus => Some(OperatorType::Minus),
        TokenKind::Star => Some(OperatorType::Mul),
        TokenKind::Slash => Some(OperatorType::Div),
        TokenKind::Equality => Some(OperatorType::Equal),
        TokenKind::NotEquality => Some(OperatorType::NotEqual),
        TokenKind::Less => Some(OperatorType::Less),
        TokenKind::LessEqual => Some(OperatorType::LessEqual),
        TokenKind::Greater => Some(OperatorType::Greater),
        TokenKind::GreaterEqual => Some(OperatorType::GreaterEqual),
        TokenKind::NullCoalescing => Some(OperatorType::NullCoalescing),
        TokenKind::LogAnd => Some(OperatorType::And),
        TokenKind::LogOr => Some(OperatorType::Or),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr(source: &str) -> DiagResult<Expression> {
        Parser::new(source).parse_expression()
    }

    fn parse_expr_ok(source: &str) -> Expression {
        parse_expr(source).expect("expression should parse")
    }

    fn as_binary(expr: &Expression) -> &BinaryExpression {
        match expr {
            Expression::Binary(binary) => binary,
            other => panic!("expected binary expression, got {:?}", other),
        }
    }

    #[test]
    fn test_literal() {
        match parse_expr_ok("42") {
            Expression::Literal(literal) => {
                assert_eq!(literal.value, LiteralValue::Integer(42));
                assert_eq!(literal.ty, ValueType::INT);
            }
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let expr = parse_expr_ok("1 + 2 * 3");
        let top = as_binary(&expr);
        assert_eq!(top.operator, OperatorType::Plus);
        assert_eq!(as_binary(&top.right).operator, OperatorType::Mul);
    }

    #[test]
    fn test_left_associativity() {
        let expr = parse_expr_ok("1 - 2 - 3");
        let top = as_binary(&expr);
        assert_eq!(top.operator, OperatorType::Minus);
        assert_eq!(as_binary(&top.left).operator, OperatorType::Minus);
    }

    #[test]
    fn test_parentheses() {
        let expr = parse_expr_ok("(1 + 2) * 3");
        let top = as_binary(&expr);
        assert_eq!(top.operator, OperatorType::Mul);
        assert_eq!(as_binary(&top.left).operator, OperatorType::Plus);
    }

    #[test]
    fn test_relational_looser_than_additive() {
        let expr = parse_expr_ok("a + 1 < b * 2");
        let top = as_binary(&expr);
        assert_eq!(top.operator, OperatorType::Less);
    }

    #[test]
    fn test_nil_coalescing_right_associative() {
        let expr = parse_expr_ok("a ?? b ?? c");
        let top = as_binary(&expr);
        assert_eq!(top.operator, OperatorType::NullCoalescing);
        assert_eq!(
            as_binary(&top.right).operator,
            OperatorType::NullCoalescing
        );
    }

    #[test]
    fn test_postfix_unwrap() {
        match parse_expr_ok("a!") {
            Expression::Unary(unary) => {
                assert_eq!(unary.operator, OperatorType::Unwrap);
                assert!(!unary.is_prefix);
            }
            other => panic!("expected unary, got {:?}", other),
        }
    }

    #[test]
    fn test_unwrap_inside_sum() {
        let expr = parse_expr_ok("a! + b!");
        let top = as_binary(&expr);
        assert_eq!(top.operator, OperatorType::Plus);
        assert!(matches!(*top.left, Expression::Unary(_)));
        assert!(matches!(*top.right, Expression::Unary(_)));
    }

    #[test]
    fn test_prefix_not() {
        match parse_expr_ok("!a") {
            Expression::Unary(unary) => {
                assert_eq!(unary.operator, OperatorType::Not);
                assert!(unary.is_prefix);
            }
            other => panic!("expected unary, got {:?}", other),
        }
    }

    #[test]
    fn test_not_binds_tighter_than_and() {
        let expr = parse_expr_ok("!a && b");
        let top = as_binary(&expr);
        assert_eq!(top.operator, OperatorType::And);
        assert!(matches!(*top.left, Expression::Unary(_)));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse_expr_ok("a || b && c");
        let top = as_binary(&expr);
        assert_eq!(top.operator, OperatorType::Or);
        assert_eq!(as_binary(&top.right).operator, OperatorType::And);
    }

    #[test]
    fn test_function_call_as_operand() {
        let expr = parse_expr_ok("f(1) + g(x: 2)");
        let top = as_binary(&expr);
        match (&*top.left, &*top.right) {
            (Expression::FunctionCall(f), Expression::FunctionCall(g)) => {
                assert_eq!(f.name.name, "f");
                assert_eq!(g.name.name, "g");
                assert!(g.arguments[0].label.is_some());
            }
            other => panic!("expected two calls, got {:?}", other),
        }
    }

    #[test]
    fn test_call_result_unwrap() {
        match parse_expr_ok("f(x)!") {
            Expression::Unary(unary) => {
                assert_eq!(unary.operator, OperatorType::Unwrap);
                assert!(matches!(*unary.argument, Expression::FunctionCall(_)));
            }
            other => panic!("expected unary, got {:?}", other),
        }
    }

    #[test]
    fn test_interpolation_operand() {
        match parse_expr_ok(r#""a\(x)b""#) {
            Expression::Interpolation(interp) => {
                assert_eq!(interp.strings, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(interp.expressions.len(), 1);
            }
            other => panic!("expected interpolation, got {:?}", other),
        }
    }

    #[test]
    fn test_newline_separated_operand_terminates() {
        // `x` starts the next statement; the expression is `1 + 2`.
        let mut parser = Parser::new("1 + 2\nx = 5");
        let expr = parser.parse_expression().unwrap();
        assert_eq!(as_binary(&expr).operator, OperatorType::Plus);
        assert_eq!(parser.peek(1).unwrap().text(), Some("x"));
    }

    #[test]
    fn test_trailing_operator_continues_across_newline() {
        let expr = parse_expr_ok("1 +\n2");
        assert_eq!(as_binary(&expr).operator, OperatorType::Plus);
    }

    #[test]
    fn test_terminator_not_consumed() {
        let mut parser = Parser::new("1 + 2\nx");
        parser.parse_expression().unwrap();
        let next = parser.peek(1).unwrap();
        assert_eq!(next.text(), Some("x"));
        assert!(next.whitespace.has_left_newline());
    }

    #[test]
    fn test_two_operands_rejected() {
        assert!(parse_expr("1 2").is_err());
    }

    #[test]
    fn test_two_operators_rejected() {
        assert!(parse_expr("1 + * 2").is_err());
    }

    #[test]
    fn test_unbalanced_parenthesis_rejected() {
        assert!(parse_expr("(1 + 2").is_err());
    }

    #[test]
    fn test_empty_expression_rejected() {
        assert!(parse_expr("").is_err());
        assert!(parse_expr(")").is_err());
    }

    #[test]
    fn test_compound_assignment_rejected() {
        // `+=` lexes but cannot extend an expression, so the
        // statement level rejects the leftover token.
        assert!(Parser::new("x = y += 1").parse().is_err());

        // Inside parentheses the expression parser itself fails.
        assert!(parse_expr("(y += 1)").is_err());
    }
}
