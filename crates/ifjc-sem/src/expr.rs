//! Expression type resolution.
//!
//! `resolve_expression_type` is the analyser's recursive workhorse:
//! it walks an expression, annotates nodes with their resolved types
//! and returns the overall type, driven by a preferred type from the
//! surrounding context. The only implicit conversion is the
//! Int→Double retyping of integer literals; a literal promoted while
//! one overload was speculated is rolled back to its original pair
//! when a later visit prefers something else.

use ifjc_par::ast::{
    BinaryExpression, BuiltInFunction, Expression, FunctionCall, Identifier,
    InterpolationExpression, LiteralExpression, LiteralValue, NodeId, OperatorType, Primitive,
    UnaryExpression, ValueType,
};
use ifjc_util::{DiagResult, Diagnostic, ErrorKind};

use crate::scope::ScopeId;
use crate::types::{boolean_test_error, is_type_equal, is_value_assignable};
use crate::{internal_error, Analyser, Declaration, ParamSig};

impl Analyser {
    /// Resolves the type of `node` under the given preferred type,
    /// annotating the expression tree in place.
    pub(crate) fn resolve_expression_type(
        &mut self,
        node: &mut Expression,
        scope: ScopeId,
        preferred: ValueType,
    ) -> DiagResult<ValueType> {
        match node {
            Expression::Literal(literal) => Ok(resolve_literal(literal, preferred)),
            Expression::Identifier(identifier) => self.resolve_identifier(identifier, scope),
            Expression::FunctionCall(call) => self.resolve_call(call, scope, preferred),
            Expression::Unary(unary) => self.resolve_unary(unary, scope, preferred),
            Expression::Binary(binary) => self.resolve_binary(binary, scope, preferred),
            Expression::Interpolation(interpolation) => {
                self.resolve_interpolation(interpolation, scope)
            }
        }
    }

    fn resolve_identifier(
        &mut self,
        identifier: &mut Identifier,
        scope: ScopeId,
    ) -> DiagResult<ValueType> {
        // Already bound on an earlier visit.
        if identifier.id != 0 {
            return self
                .variable(identifier.id)
                .map(|v| v.ty)
                .ok_or_else(|| internal_error("identifier bound to a missing declaration"));
        }

        let Some(declaration_id) = self.scopes().lookup_variable(&identifier.name, scope) else {
            return Err(Diagnostic::error(
                ErrorKind::UndefinedVariable,
                format!("cannot find '{}' in scope", identifier.name),
            ));
        };

        let declaration = self
            .variable(declaration_id)
            .ok_or_else(|| internal_error("scope entry is not a variable"))?;
        let ty = declaration.ty;

        if ty.primitive == Primitive::Unknown {
            return Err(Diagnostic::error(
                ErrorKind::InferenceFailure,
                format!("cannot infer type of '{}'", identifier.name),
            ));
        }

        if !ty.is_nullable && !declaration.is_initialized {
            return Err(Diagnostic::error(
                ErrorKind::UndefinedVariable,
                format!(
                    "variable '{}' used before being initialized",
                    identifier.name
                ),
            ));
        }

        identifier.id = declaration_id;
        if let Some(Declaration::Variable(variable)) = self.ids.get_mut(&declaration_id) {
            variable.is_used = true;
        }

        Ok(ty)
    }

    fn resolve_call(
        &mut self,
        call: &mut FunctionCall,
        scope: ScopeId,
        preferred: ValueType,
    ) -> DiagResult<ValueType> {
        // Already resolved on an earlier visit.
        if call.name.id != 0 {
            return self
                .function(call.name.id)
                .map(|f| f.return_type)
                .ok_or_else(|| internal_error("call bound to a missing declaration"));
        }

        // Inside a function, a local variable shadows any function of
        // the same name.
        if self.scopes().get(scope).parent.is_some() {
            if let Some(shadow) = self.scopes().lookup_variable(&call.name.name, scope) {
                let ty = self.variable(shadow).map(|v| v.ty).unwrap_or(ValueType::INVALID);
                return Err(Diagnostic::error(
                    ErrorKind::InvalidCallType,
                    format!("cannot call value of non-function type '{}'", ty),
                ));
            }
        }

        let overloads = self.overloads_of(&call.name.name).map(<[NodeId]>::to_vec);

        let mut declaration: Option<NodeId> = None;
        let mut has_multiple_candidates = false;

        match &overloads {
            Some(list) if list.len() > 1 => {
                let candidates = self.resolve_overload_candidates(call, scope, list)?;

                // Narrow by the preferred return type.
                for candidate in candidates {
                    let return_type = self
                        .function(candidate)
                        .map(|f| f.return_type)
                        .unwrap_or(ValueType::INVALID);

                    if preferred.primitive == Primitive::Unknown
                        || is_type_equal(preferred, return_type)
                        || is_value_assignable(preferred, return_type)
                    {
                        if declaration.is_some() {
                            has_multiple_candidates = true;
                            break;
                        }
                        declaration = Some(candidate);
                    }
                }
            }
            Some(list) => declaration = list.first().copied(),
            None => {
                return Err(Diagnostic::error(
                    ErrorKind::UndefinedFunction,
                    format!("cannot find '{}' in scope", call.name.name),
                ));
            }
        }

        // The built-in `write` is variadic over any scalar type.
        if call.name.name == "write" {
            let single = overloads.as_ref().map(|l| l.len() == 1).unwrap_or(false);
            if declaration.is_none() || single {
                if let Some(write_id) = self
                    .overloads_of("write")
                    .and_then(|list| list.first().copied())
                {
                    if self.builtin_by_id(write_id) == BuiltInFunction::Write {
                        return self.resolve_write_call(call, scope, write_id);
                    }
                }
            }
        }

        let Some(declaration_id) = declaration else {
            return Err(Diagnostic::error(
                ErrorKind::UndefinedFunction,
                format!(
                    "no exact matches in call to global function '{}'",
                    call.name.name
                ),
            ));
        };

        if has_multiple_candidates {
            return Err(Diagnostic::error(
                ErrorKind::OtherSemantic,
                format!("ambiguous use of '{}'", call.name.name),
            ));
        }

        // Check labels and argument types against the chosen
        // overload; this re-resolution also settles literal
        // promotions for its parameter types.
        let params = self
            .function(declaration_id)
            .map(|f| f.params.clone())
            .ok_or_else(|| internal_error("overload entry is not a function"))?;
        let return_type = self
            .function(declaration_id)
            .map(|f| f.return_type)
            .unwrap_or(ValueType::INVALID);

        self.check_call_arguments(call, scope, &params)?;

        call.name.id = declaration_id;
        if let Some(Declaration::Function(function)) = self.ids.get_mut(&declaration_id) {
            function.is_used = true;
        }

        Ok(return_type)
    }

    /// Enumerates the overloads whose arity, labels and argument
    /// types all fit the call.
    fn resolve_overload_candidates(
        &mut self,
        call: &mut FunctionCall,
        scope: ScopeId,
        overloads: &[NodeId],
    ) -> DiagResult<Vec<NodeId>> {
        let mut candidates = Vec::new();

        for &overload in overloads {
            let params = match self.function(overload) {
                Some(function) => function.params.clone(),
                None => continue,
            };

            if params.len() != call.arguments.len() {
                continue;
            }

            let mut matched = true;
            for (parameter, argument) in params.iter().zip(call.arguments.iter_mut()) {
                if parameter.is_labeless && argument.label.is_some() {
                    matched = false;
                    break;
                }
                if !parameter.is_labeless {
                    match &argument.label {
                        Some(label) if label.name == parameter.label => {}
                        _ => {
                            matched = false;
                            break;
                        }
                    }
                }

                let argument_ty =
                    self.resolve_expression_type(&mut argument.expression, scope, parameter.ty)?;

                if !is_value_assignable(parameter.ty, argument_ty) {
                    matched = false;
                    break;
                }
            }

            if matched {
                candidates.push(overload);
            }
        }

        Ok(candidates)
    }

    /// Final argument validation against one chosen overload.
    fn check_call_arguments(
        &mut self,
        call: &mut FunctionCall,
        scope: ScopeId,
        params: &[ParamSig],
    ) -> DiagResult<()> {
        let count = call.arguments.len().max(params.len());

        for index in 0..count {
            let Some(parameter) = params.get(index) else {
                return Err(Diagnostic::error(
                    ErrorKind::InvalidCallType,
                    "extra argument in call",
                ));
            };
            let Some(argument) = call.arguments.get_mut(index) else {
                return Err(Diagnostic::error(
                    ErrorKind::InvalidCallType,
                    format!(
                        "missing argument for parameter '{}' in call",
                        parameter.label
                    ),
                ));
            };

            if parameter.is_labeless {
                if let Some(label) = &argument.label {
                    return Err(Diagnostic::error(
                        ErrorKind::OtherSemantic,
                        format!("extraneous argument label '{}:' in call", label.name),
                    ));
                }
            } else {
                match &argument.label {
                    None => {
                        return Err(Diagnostic::error(
                            ErrorKind::OtherSemantic,
                            format!("missing argument label '{}:' in call", parameter.label),
                        ));
                    }
                    Some(label) if label.name != parameter.label => {
                        return Err(Diagnostic::error(
                            ErrorKind::OtherSemantic,
                            format!(
                                "incorrect argument label in call (have '{}:', expected '{}:')",
                                label.name, parameter.label
                            ),
                        ));
                    }
                    Some(_) => {}
                }
            }

            let argument_ty =
                self.resolve_expression_type(&mut argument.expression, scope, parameter.ty)?;

            if !is_value_assignable(parameter.ty, argument_ty) {
                return Err(Diagnostic::error(
                    ErrorKind::InvalidCallType,
                    format!(
                        "cannot convert value of type '{}' to expected argument type '{}'",
                        argument_ty, parameter.ty
                    ),
                ));
            }
        }

        Ok(())
    }

    /// `write` accepts any number of scalar arguments of any type,
    /// nullable or not, and returns Void.
    fn resolve_write_call(
        &mut self,
        call: &mut FunctionCall,
        scope: ScopeId,
        write_id: NodeId,
    ) -> DiagResult<ValueType> {
        for argument in &mut call.arguments {
            let ty =
                self.resolve_expression_type(&mut argument.expression, scope, ValueType::UNKNOWN)?;

            let scalar = matches!(
                ty.primitive,
                Primitive::Int
                    | Primitive::Double
                    | Primitive::Bool
                    | Primitive::String
                    | Primitive::Nil
            );
            if !scalar {
                return Err(Diagnostic::error(
                    ErrorKind::InvalidCallType,
                    format!(
                        "cannot convert value of type '{}' to expected argument type \
                         'Int? | Double? | String? | Bool?'",
                        ty
                    ),
                ));
            }
        }

        call.name.id = write_id;
        if let Some(Declaration::Function(function)) = self.ids.get_mut(&write_id) {
            function.is_used = true;
        }

        Ok(ValueType::VOID)
    }

    fn resolve_unary(
        &mut self,
        unary: &mut UnaryExpression,
        scope: ScopeId,
        preferred: ValueType,
    ) -> DiagResult<ValueType> {
        match unary.operator {
            OperatorType::Unwrap => {
                let ty = self.resolve_expression_type(
                    &mut unary.argument,
                    scope,
                    ValueType::new(preferred.primitive, true),
                )?;

                if !ty.is_nullable {
                    return Err(Diagnostic::error(
                        ErrorKind::TypeIncompatibility,
                        format!("cannot force unwrap value of non-optional type '{}'", ty),
                    ));
                }

                unary.ty = ty.unwrapped();
            }
            OperatorType::Not => {
                let ty = self.resolve_expression_type(&mut unary.argument, scope, preferred)?;

                if ty.primitive != Primitive::Bool {
                    return Err(Diagnostic::error(
                        ErrorKind::TypeIncompatibility,
                        boolean_test_error(ty),
                    ));
                }
                if ty.is_nullable {
                    return Err(Diagnostic::error(
                        ErrorKind::TypeIncompatibility,
                        format!(
                            "value of optional type '{}' must be unwrapped to a value of type 'Bool'",
                            ty
                        ),
                    ));
                }

                unary.ty = ValueType::BOOL;
            }
            other => {
                return Err(Diagnostic::error(
                    ErrorKind::Syntax,
                    format!(
                        "'{}' is not a {} unary operator",
                        other.lexeme(),
                        if unary.is_prefix { "prefix" } else { "postfix" }
                    ),
                ));
            }
        }

        Ok(unary.ty)
    }

    fn resolve_binary(
        &mut self,
        binary: &mut BinaryExpression,
        scope: ScopeId,
        preferred: ValueType,
    ) -> DiagResult<ValueType> {
        let (left_ty, right_ty) = self.resolve_binary_operands(binary, scope, preferred)?;

        let operator = binary.operator;
        let ty = match operator {
            OperatorType::Plus | OperatorType::Minus | OperatorType::Mul | OperatorType::Div => {
                if left_ty.is_nullable || right_ty.is_nullable {
                    let base = if left_ty.is_nullable { left_ty } else { right_ty };
                    return Err(Diagnostic::error(
                        ErrorKind::TypeIncompatibility,
                        format!(
                            "value of optional type '{}' must be unwrapped to a value of type '{}'",
                            base,
                            base.unwrapped()
                        ),
                    ));
                }

                let left_literal = matches!(*binary.left, Expression::Literal(_));
                let right_literal = matches!(*binary.right, Expression::Literal(_));

                let primitive = if operator == OperatorType::Plus
                    && left_ty.primitive == Primitive::String
                    && right_ty.primitive == Primitive::String
                {
                    Primitive::String
                } else if left_ty.primitive == Primitive::Int
                    && right_ty.primitive == Primitive::Int
                {
                    Primitive::Int
                } else if left_ty.primitive == Primitive::Double
                    && right_ty.primitive == Primitive::Double
                {
                    Primitive::Double
                } else if operator != OperatorType::Div
                    && left_literal
                    && left_ty.primitive == Primitive::Int
                    && right_ty.primitive == Primitive::Double
                {
                    Primitive::Double
                } else if operator != OperatorType::Div
                    && right_literal
                    && left_ty.primitive == Primitive::Double
                    && right_ty.primitive == Primitive::Int
                {
                    Primitive::Double
                } else {
                    return Err(self.binary_operand_error(operator, left_ty, right_ty));
                };

                ValueType::new(primitive, false)
            }

            OperatorType::Equal | OperatorType::NotEqual => {
                let left_literal = matches!(*binary.left, Expression::Literal(_));
                let right_literal = matches!(*binary.right, Expression::Literal(_));

                let comparable = left_ty.primitive == right_ty.primitive
                    || left_ty.primitive == Primitive::Nil
                    || right_ty.primitive == Primitive::Nil
                    || (left_literal
                        && left_ty.primitive == Primitive::Int
                        && right_ty.primitive == Primitive::Double)
                    || (right_literal
                        && left_ty.primitive == Primitive::Double
                        && right_ty.primitive == Primitive::Int);

                if !comparable {
                    return Err(self.binary_operand_error(operator, left_ty, right_ty));
                }

                ValueType::new(
                    Primitive::Bool,
                    left_ty.is_nullable || right_ty.is_nullable,
                )
            }

            OperatorType::Less
            | OperatorType::LessEqual
            | OperatorType::Greater
            | OperatorType::GreaterEqual => {
                if left_ty.primitive != right_ty.primitive {
                    return Err(self.binary_operand_error(operator, left_ty, right_ty));
                }
                if left_ty.is_nullable || right_ty.is_nullable {
                    return Err(Diagnostic::error(
                        ErrorKind::TypeIncompatibility,
                        format!(
                            "cannot use relational operator '{}' with optional type '{}'",
                            operator.lexeme(),
                            if left_ty.is_nullable { left_ty } else { right_ty }
                        ),
                    ));
                }

                ValueType::BOOL
            }

            OperatorType::NullCoalescing => {
                if left_ty.primitive != right_ty.primitive {
                    return Err(self.binary_operand_error(operator, left_ty, right_ty));
                }
                if right_ty.is_nullable {
                    return Err(Diagnostic::error(
                        ErrorKind::TypeIncompatibility,
                        format!(
                            "cannot use '??' operator with optional type '{}' on right side",
                            right_ty
                        ),
                    ));
                }

                ValueType::new(right_ty.primitive, left_ty.is_nullable)
            }

            OperatorType::And | OperatorType::Or => {
                if left_ty.primitive != Primitive::Bool || right_ty.primitive != Primitive::Bool {
                    let offending = if left_ty.primitive != Primitive::Bool {
                        left_ty
                    } else {
                        right_ty
                    };
                    return Err(Diagnostic::error(
                        ErrorKind::TypeIncompatibility,
                        boolean_test_error(offending),
                    ));
                }
                if left_ty.is_nullable || right_ty.is_nullable {
                    let offending = if left_ty.is_nullable { left_ty } else { right_ty };
                    return Err(Diagnostic::error(
                        ErrorKind::TypeIncompatibility,
                        format!(
                            "value of optional type '{}' must be unwrapped to a value of type 'Bool'",
                            offending
                        ),
                    ));
                }

                ValueType::BOOL
            }

            _ => {
                return Err(internal_error("unexpected operator in binary expression"));
            }
        };

        binary.ty = ty;
        Ok(ty)
    }

    /// Resolves both operand types. With no preferred type and a
    /// function call on either side, one side is resolved first and
    /// its type drives the other, retrying the first side when that
    /// fails; this disambiguates overloads-on-return-type like
    /// `f() + g()`.
    fn resolve_binary_operands(
        &mut self,
        binary: &mut BinaryExpression,
        scope: ScopeId,
        preferred: ValueType,
    ) -> DiagResult<(ValueType, ValueType)> {
        if preferred.primitive != Primitive::Unknown {
            let left = self.resolve_expression_type(&mut binary.left, scope, preferred)?;
            let right = self.resolve_expression_type(&mut binary.right, scope, preferred)?;
            return Ok((left, right));
        }

        let left_is_call = matches!(*binary.left, Expression::FunctionCall(_));
        let right_is_call = matches!(*binary.right, Expression::FunctionCall(_));

        match (left_is_call, right_is_call) {
            (false, false) => {
                let left_result = self.resolve_expression_type(&mut binary.left, scope, preferred);
                let right_result =
                    self.resolve_expression_type(&mut binary.right, scope, preferred);

                match (left_result, right_result) {
                    (Ok(mut left), Ok(mut right)) => {
                        // Align a mixed Int/Double pair by retyping
                        // the Int side under a Double preference.
                        if left.primitive == Primitive::Int && right.primitive == Primitive::Double
                        {
                            left =
                                self.resolve_expression_type(&mut binary.left, scope, right)?;
                        } else if left.primitive == Primitive::Double
                            && right.primitive == Primitive::Int
                        {
                            right =
                                self.resolve_expression_type(&mut binary.right, scope, left)?;
                        }
                        Ok((left, right))
                    }
                    (Ok(left), Err(right_err)) => {
                        match self.resolve_expression_type(&mut binary.right, scope, left) {
                            Ok(right) => Ok((left, right)),
                            Err(_) if left.primitive == Primitive::Int => {
                                let widened = self.resolve_expression_type(
                                    &mut binary.left,
                                    scope,
                                    ValueType::new(Primitive::Double, left.is_nullable),
                                )?;
                                if widened.primitive == Primitive::Double {
                                    let right = self.resolve_expression_type(
                                        &mut binary.right,
                                        scope,
                                        widened,
                                    )?;
                                    Ok((widened, right))
                                } else {
                                    Err(right_err)
                                }
                            }
                            Err(_) => Err(right_err),
                        }
                    }
                    (Err(left_err), Ok(right)) => {
                        match self.resolve_expression_type(&mut binary.left, scope, right) {
                            Ok(left) => Ok((left, right)),
                            Err(_) if right.primitive == Primitive::Int => {
                                let widened = self.resolve_expression_type(
                                    &mut binary.right,
                                    scope,
                                    ValueType::new(Primitive::Double, right.is_nullable),
                                )?;
                                if widened.primitive == Primitive::Double {
                                    let left = self.resolve_expression_type(
                                        &mut binary.left,
                                        scope,
                                        widened,
                                    )?;
                                    Ok((left, widened))
                                } else {
                                    Err(left_err)
                                }
                            }
                            Err(_) => Err(left_err),
                        }
                    }
                    (Err(left_err), Err(_)) => Err(left_err),
                }
            }

            (false, true) => {
                let left = self.resolve_expression_type(&mut binary.left, scope, preferred)?;
                let right = self.resolve_expression_type(&mut binary.right, scope, left)?;
                Ok((left, right))
            }

            (true, false) => {
                let right = self.resolve_expression_type(&mut binary.right, scope, preferred)?;
                let left = self.resolve_expression_type(&mut binary.left, scope, right)?;
                Ok((left, right))
            }

            (true, true) => {
                match self.resolve_expression_type(&mut binary.left, scope, preferred) {
                    Ok(left) => {
                        let right =
                            self.resolve_expression_type(&mut binary.right, scope, left)?;
                        Ok((left, right))
                    }
                    Err(_) => {
                        // Left side failed without a constraint; let
                        // the right side drive it instead.
                        let right =
                            self.resolve_expression_type(&mut binary.right, scope, preferred)?;
                        let left =
                            self.resolve_expression_type(&mut binary.left, scope, right)?;
                        Ok((left, right))
                    }
                }
            }
        }
    }

    fn resolve_interpolation(
        &mut self,
        interpolation: &mut InterpolationExpression,
        scope: ScopeId,
    ) -> DiagResult<ValueType> {
        for expression in &mut interpolation.expressions {
            self.resolve_expression_type(expression, scope, ValueType::UNKNOWN)?;
        }

        Ok(ValueType::STRING)
    }

    fn binary_operand_error(
        &self,
        operator: OperatorType,
        left: ValueType,
        right: ValueType,
    ) -> Diagnostic {
        Diagnostic::error(
            ErrorKind::TypeIncompatibility,
            format!(
                "binary operator '{}' cannot be applied to operands of type '{}' and '{}'",
                operator.lexeme(),
                left,
                right
            ),
        )
    }

}

/// Literal typing: promote an Int literal under a Double preference
/// by rewriting the value in place; roll a stale promotion back to
/// the original pair when the preference changed.
fn resolve_literal(literal: &mut LiteralExpression, preferred: ValueType) -> ValueType {
    if preferred.primitive == Primitive::Double
        && literal.original_ty.primitive == Primitive::Int
    {
        if let LiteralValue::Integer(value) = literal.original_value {
            literal.value = LiteralValue::Floating(value as f64);
            literal.ty = ValueType::new(Primitive::Double, literal.ty.is_nullable);
        }
    } else if literal.original_ty.primitive == Primitive::Int
        && literal.ty.primitive == Primitive::Double
    {
        literal.value = literal.original_value.clone();
        literal.ty = literal.original_ty;
    }

    literal.ty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_promotion_and_rollback() {
        let mut literal = LiteralExpression::new(ValueType::INT, LiteralValue::Integer(5));

        let ty = resolve_literal(&mut literal, ValueType::DOUBLE);
        assert_eq!(ty, ValueType::DOUBLE);
        assert_eq!(literal.value, LiteralValue::Floating(5.0));

        let ty = resolve_literal(&mut literal, ValueType::INT);
        assert_eq!(ty, ValueType::INT);
        assert_eq!(literal.value, LiteralValue::Integer(5));

        let ty = resolve_literal(&mut literal, ValueType::UNKNOWN);
        assert_eq!(ty, ValueType::INT);
    }

    #[test]
    fn test_non_integer_literals_unaffected() {
        let mut literal =
            LiteralExpression::new(ValueType::STRING, LiteralValue::String("x".into()));
        assert_eq!(resolve_literal(&mut literal, ValueType::DOUBLE), ValueType::STRING);

        let mut nil = LiteralExpression::new(ValueType::NIL, LiteralValue::Nil);
        assert_eq!(resolve_literal(&mut nil, ValueType::DOUBLE), ValueType::NIL);
    }
}
