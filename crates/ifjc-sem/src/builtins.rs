//! Built-in function prelude.
//!
//! The built-ins are declared as IFJ23 source and parsed with the
//! ordinary lexer and parser, then each declaration is tagged with
//! its discriminant and prepended to the user program. The first ten
//! are stubs whose bodies the emitter replaces with native
//! instruction sequences; the `__stringify__` overloads and their
//! helpers are real IFJ23 code compiled with the program and called
//! by the lowering of `write` arguments and string interpolation.

use ifjc_par::ast::BuiltInFunction;

/// Source of the prelude. Declaration order must match [`TAGS`].
pub const SOURCE: &str = r#"func readString() -> String? {return nil}
func readInt() -> Int? {return nil}
func readDouble() -> Double? {return nil}
func write() {}
func Int2Double(_ term: Int) -> Double {return 0.0}
func Double2Int(_ term: Double) -> Int {return 0}
func length(_ s: String) -> Int {return 0}
func substring(of s: String, startingAt i: Int, endingBefore j: Int) -> String? {return nil}
func ord(_ c: String) -> Int {return 0}
func chr(_ i: Int) -> String {return ""}

func __stringify__(_ n: Double?) -> String {
    if let n {
        return __format__(n)
    }
    return "nil"
}

func __stringify__(_ n: Int?) -> String {
    if let n {
        return __format__(Int2Double(n))
    }
    return "nil"
}

func __stringify__(_ b: Bool?) -> String {
    if let b {
        if b {
            return "true"
        }
        return "false"
    }
    return "nil"
}

func __stringify__(_ s: String?) -> String {
    if let s {
        return s
    }
    return "nil"
}

func __modulo__(_ a: Double, _ b: Double) -> Int {
    return Double2Int(a - Int2Double(Double2Int(a / b)) * b)
}

func __format__(_ n: Double) -> String {
    if n == 0.0 {
        return "0"
    }

    var num = n
    var isNegative = false
    if num < 0.0 {
        isNegative = true
        num = 0.0 - num
    }

    var integerPart = Int2Double(Double2Int(num))
    var fractionalPart = num - integerPart
    let hasFractionalPart = fractionalPart > 0.0

    var integerResult = ""
    var divisor = 1.0

    // Find the divisor selecting the most significant integer digit
    while integerPart / divisor >= 10.0 {
        divisor = divisor * 10.0
    }

    // Extract the integer digits
    while divisor >= 1.0 {
        let digit = Double2Int(integerPart / divisor)
        integerResult = integerResult + chr(digit + 48)
        integerPart = Int2Double(__modulo__(integerPart, divisor))
        divisor = divisor / 10.0
    }

    let precision = 15
    var position = 0
    var fractionalResult = ""

    let floatOffset = length(integerResult) + 1
    var zeroIndex = 0

    // Extract the fractional digits, remembering trailing zeros
    while precision > position && fractionalPart > 0.0 {
        fractionalPart = fractionalPart * 10.0
        let digit = Double2Int(fractionalPart)
        fractionalResult = fractionalResult + chr(digit + 48)
        fractionalPart = fractionalPart - Int2Double(digit)
        position = position + 1

        if digit == 0 {
            if zeroIndex == 0 {
                zeroIndex = position
            }
        } else {
            zeroIndex = 0
        }
    }

    if hasFractionalPart {
        integerResult = integerResult + "." + fractionalResult
    }

    // Drop trailing zeros
    if zeroIndex > 0 {
        let trimmed = substring(of: integerResult, startingAt: 0, endingBefore: floatOffset + zeroIndex - 1)
        integerResult = trimmed!
    }

    if isNegative {
        integerResult = "-" + integerResult
    }

    return integerResult
}
"#;

/// Discriminants of the prelude declarations, in source order. The
/// digit-extraction helper `__format__` is ordinary prelude code and
/// carries no discriminant.
pub const TAGS: &[BuiltInFunction] = &[
    BuiltInFunction::ReadString,
    BuiltInFunction::ReadInt,
    BuiltInFunction::ReadDouble,
    BuiltInFunction::Write,
    BuiltInFunction::IntToDouble,
    BuiltInFunction::DoubleToInt,
    BuiltInFunction::Length,
    BuiltInFunction::Substring,
    BuiltInFunction::Ord,
    BuiltInFunction::Chr,
    BuiltInFunction::Stringify,
    BuiltInFunction::Stringify,
    BuiltInFunction::Stringify,
    BuiltInFunction::Stringify,
    BuiltInFunction::Modulo,
    BuiltInFunction::None,
];

/// Number of prelude declarations.
pub fn count() -> usize {
    TAGS.len()
}
