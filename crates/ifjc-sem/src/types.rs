//! Type compatibility rules.
//!
//! Variables never promote implicitly; the only implicit conversion
//! in the language is the Int→Double retyping of integer literals,
//! which happens inside expression resolution, not here.

use ifjc_par::ast::{Primitive, ValueType};

/// Resolves a written type name to its primitive, or `Invalid` for
/// anything that is not a known type.
pub fn resolve_type_name(name: &str) -> Primitive {
    match name {
        "Int" => Primitive::Int,
        "Double" => Primitive::Double,
        "Bool" => Primitive::Bool,
        "String" => Primitive::String,
        "Void" => Primitive::Void,
        _ => Primitive::Invalid,
    }
}

/// Returns true when both primitive and nullability agree.
pub fn is_type_equal(a: ValueType, b: ValueType) -> bool {
    a.primitive == b.primitive && a.is_nullable == b.is_nullable
}

/// Returns true when a value of type `value` may be stored in a slot
/// of type `target`: `nil` goes into any nullable slot, otherwise the
/// primitives must match and nullability may only widen.
pub fn is_value_assignable(target: ValueType, value: ValueType) -> bool {
    if target.primitive == Primitive::Unknown {
        return true;
    }
    if value.primitive == Primitive::Nil {
        return target.is_nullable;
    }

    target.primitive == value.primitive && (target.is_nullable || !value.is_nullable)
}

/// Formats the "cannot be used as a boolean" message, with the
/// idiomatic-test hint matching the offending type.
pub fn boolean_test_error(ty: ValueType) -> String {
    let hint = if ty.is_nullable {
        "; test for '!= nil' instead"
    } else {
        match ty.primitive {
            Primitive::Int => "; test for '!= 0' instead",
            Primitive::Double => "; test for '!= 0.0' instead",
            Primitive::String => "; test for '!= \"\"' instead",
            _ => "",
        }
    };

    format!("type '{}' cannot be used as a boolean{}", ty, hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_type_name() {
        assert_eq!(resolve_type_name("Int"), Primitive::Int);
        assert_eq!(resolve_type_name("Double"), Primitive::Double);
        assert_eq!(resolve_type_name("Bool"), Primitive::Bool);
        assert_eq!(resolve_type_name("String"), Primitive::String);
        assert_eq!(resolve_type_name("Void"), Primitive::Void);
        assert_eq!(resolve_type_name("Float"), Primitive::Invalid);
        assert_eq!(resolve_type_name("int"), Primitive::Invalid);
    }

    #[test]
    fn test_same_type_assignable() {
        assert!(is_value_assignable(ValueType::INT, ValueType::INT));
        assert!(is_value_assignable(ValueType::STRING, ValueType::STRING));
    }

    #[test]
    fn test_no_implicit_variable_promotion() {
        assert!(!is_value_assignable(ValueType::DOUBLE, ValueType::INT));
        assert!(!is_value_assignable(ValueType::INT, ValueType::DOUBLE));
    }

    #[test]
    fn test_nullability_widens_only() {
        assert!(is_value_assignable(
            ValueType::INT.nullable(),
            ValueType::INT
        ));
        assert!(!is_value_assignable(
            ValueType::INT,
            ValueType::INT.nullable()
        ));
    }

    #[test]
    fn test_nil_needs_nullable_target() {
        assert!(is_value_assignable(
            ValueType::STRING.nullable(),
            ValueType::NIL
        ));
        assert!(!is_value_assignable(ValueType::STRING, ValueType::NIL));
    }

    #[test]
    fn test_unknown_target_accepts_all() {
        assert!(is_value_assignable(ValueType::UNKNOWN, ValueType::INT));
        assert!(is_value_assignable(ValueType::UNKNOWN, ValueType::NIL));
    }

    #[test]
    fn test_boolean_test_error_hints() {
        assert!(boolean_test_error(ValueType::INT).contains("!= 0"));
        assert!(boolean_test_error(ValueType::INT.nullable()).contains("!= nil"));
        assert!(boolean_test_error(ValueType::STRING).contains("!= \"\""));
    }
}
