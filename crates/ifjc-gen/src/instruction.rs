//! IFJcode23 instruction writer.
//!
//! A thin textual layer over the target language: one method per
//! instruction shape, writing into an output buffer. Values are
//! rendered as typed symbols (`int@`, `float@`, `bool@`, `string@`,
//! `nil@nil`), with strings escaped and floats printed in the
//! hexadecimal form the interpreter expects.

use std::fmt::Write as _;

/// Output buffer for generated assembly.
#[derive(Debug, Default)]
pub struct Assembly {
    out: String,
}

impl Assembly {
    pub fn new() -> Self {
        let mut asm = Self { out: String::new() };
        asm.line(".IFJcode23");
        asm
    }

    /// Returns the finished assembly text.
    pub fn finish(self) -> String {
        self.out
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    pub fn comment(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.out, "# {}", text.as_ref());
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    // ----------------------------------------------------------------
    // Frames and variables
    // ----------------------------------------------------------------

    pub fn defvar(&mut self, var: &str) {
        let _ = writeln!(self.out, "DEFVAR {}", var);
    }

    pub fn move_symb(&mut self, var: &str, symb: &str) {
        let _ = writeln!(self.out, "MOVE {} {}", var, symb);
    }

    pub fn createframe(&mut self) {
        self.line("CREATEFRAME");
    }

    pub fn pushframe(&mut self) {
        self.line("PUSHFRAME");
    }

    pub fn popframe(&mut self) {
        self.line("POPFRAME");
    }

    // ----------------------------------------------------------------
    // Data stack
    // ----------------------------------------------------------------

    pub fn pushs(&mut self, symb: &str) {
        let _ = writeln!(self.out, "PUSHS {}", symb);
    }

    pub fn pops(&mut self, var: &str) {
        let _ = writeln!(self.out, "POPS {}", var);
    }

    pub fn clears(&mut self) {
        self.line("CLEARS");
    }

    pub fn adds(&mut self) {
        self.line("ADDS");
    }

    pub fn subs(&mut self) {
        self.line("SUBS");
    }

    pub fn muls(&mut self) {
        self.line("MULS");
    }

    pub fn divs(&mut self) {
        self.line("DIVS");
    }

    pub fn idivs(&mut self) {
        self.line("IDIVS");
    }

    pub fn lts(&mut self) {
        self.line("LTS");
    }

    pub fn gts(&mut self) {
        self.line("GTS");
    }

    pub fn eqs(&mut self) {
        self.line("EQS");
    }

    pub fn ands(&mut self) {
        self.line("ANDS");
    }

    pub fn ors(&mut self) {
        self.line("ORS");
    }

    pub fn nots(&mut self) {
        self.line("NOTS");
    }

    pub fn int2floats(&mut self) {
        self.line("INT2FLOATS");
    }

    pub fn float2ints(&mut self) {
        self.line("FLOAT2INTS");
    }

    pub fn int2chars(&mut self) {
        self.line("INT2CHARS");
    }

    // ----------------------------------------------------------------
    // Arithmetic and strings on variables
    // ----------------------------------------------------------------

    pub fn add(&mut self, dst: &str, a: &str, b: &str) {
        let _ = writeln!(self.out, "ADD {} {} {}", dst, a, b);
    }

    pub fn concat(&mut self, dst: &str, a: &str, b: &str) {
        let _ = writeln!(self.out, "CONCAT {} {} {}", dst, a, b);
    }

    pub fn strlen(&mut self, dst: &str, symb: &str) {
        let _ = writeln!(self.out, "STRLEN {} {}", dst, symb);
    }

    pub fn getchar(&mut self, dst: &str, s: &str, index: &str) {
        let _ = writeln!(self.out, "GETCHAR {} {} {}", dst, s, index);
    }

    pub fn stri2int(&mut self, dst: &str, s: &str, index: &str) {
        let _ = writeln!(self.out, "STRI2INT {} {} {}", dst, s, index);
    }

    pub fn lt(&mut self, dst: &str, a: &str, b: &str) {
        let _ = writeln!(self.out, "LT {} {} {}", dst, a, b);
    }

    pub fn gt(&mut self, dst: &str, a: &str, b: &str) {
        let _ = writeln!(self.out, "GT {} {} {}", dst, a, b);
    }

    // ----------------------------------------------------------------
    // Control flow
    // ----------------------------------------------------------------

    pub fn label(&mut self, name: &str) {
        let _ = writeln!(self.out, "LABEL {}", name);
    }

    pub fn jump(&mut self, name: &str) {
        let _ = writeln!(self.out, "JUMP {}", name);
    }

    pub fn jumpifeq(&mut self, name: &str, a: &str, b: &str) {
        let _ = writeln!(self.out, "JUMPIFEQ {} {} {}", name, a, b);
    }

    pub fn jumpifeqs(&mut self, name: &str) {
        let _ = writeln!(self.out, "JUMPIFEQS {}", name);
    }

    pub fn jumpifneqs(&mut self, name: &str) {
        let _ = writeln!(self.out, "JUMPIFNEQS {}", name);
    }

    pub fn call(&mut self, name: &str) {
        let _ = writeln!(self.out, "CALL {}", name);
    }

    pub fn ret(&mut self) {
        self.line("RETURN");
    }

    pub fn exit(&mut self, code: i64) {
        let _ = writeln!(self.out, "EXIT int@{}", code);
    }

    // ----------------------------------------------------------------
    // I/O
    // ----------------------------------------------------------------

    pub fn read(&mut self, var: &str, ty: &str) {
        let _ = writeln!(self.out, "READ {} {}", var, ty);
    }

    pub fn write(&mut self, symb: &str) {
        let _ = writeln!(self.out, "WRITE {}", symb);
    }
}

// --------------------------------------------------------------------
// Symbol rendering
// --------------------------------------------------------------------

/// Renders an integer literal symbol.
pub fn int_symb(value: i64) -> String {
    format!("int@{}", value)
}

/// Renders a boolean literal symbol.
pub fn bool_symb(value: bool) -> String {
    format!("bool@{}", value)
}

/// The nil symbol.
pub fn nil_symb() -> &'static str {
    "nil@nil"
}

/// Renders a string literal symbol with the target escaping rules:
/// every byte ≤ 32, `#` and `\` becomes a three-digit decimal escape.
pub fn string_symb(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        let code = c as u32;
        if code <= 32 || code == 35 || code == 92 {
            let _ = write!(escaped, "\\{:03}", code);
        } else {
            escaped.push(c);
        }
    }
    format!("string@{}", escaped)
}

/// Renders a float literal symbol in C `%a` hexadecimal notation.
pub fn float_symb(value: f64) -> String {
    format!("float@{}", hex_float(value))
}

fn hex_float(value: f64) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() {
            "-0x0p+0".to_string()
        } else {
            "0x0p+0".to_string()
        };
    }

    let bits = value.to_bits();
    let sign = if bits >> 63 == 1 { "-" } else { "" };
    let exponent = ((bits >> 52) & 0x7FF) as i64;
    let mantissa = bits & ((1u64 << 52) - 1);

    if exponent == 0 {
        // Subnormal: leading digit 0, fixed exponent.
        let mut digits = format!("{:013x}", mantissa);
        while digits.len() > 1 && digits.ends_with('0') {
            digits.pop();
        }
        return format!("{}0x0.{}p-1022", sign, digits);
    }

    let exp = exponent - 1023;
    if mantissa == 0 {
        return format!("{}0x1p{:+}", sign, exp);
    }

    let mut digits = format!("{:013x}", mantissa);
    while digits.len() > 1 && digits.ends_with('0') {
        digits.pop();
    }
    format!("{}0x1.{}p{:+}", sign, digits, exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_first() {
        let asm = Assembly::new();
        assert!(asm.finish().starts_with(".IFJcode23\n"));
    }

    #[test]
    fn test_int_and_bool_symbols() {
        assert_eq!(int_symb(42), "int@42");
        assert_eq!(int_symb(-1), "int@-1");
        assert_eq!(bool_symb(true), "bool@true");
        assert_eq!(nil_symb(), "nil@nil");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(string_symb("abc"), "string@abc");
        assert_eq!(string_symb("a b"), "string@a\\032b");
        assert_eq!(string_symb("a\nb"), "string@a\\010b");
        assert_eq!(string_symb("#\\"), "string@\\035\\092");
        assert_eq!(string_symb(""), "string@");
    }

    #[test]
    fn test_hex_float() {
        assert_eq!(hex_float(0.0), "0x0p+0");
        assert_eq!(hex_float(1.0), "0x1p+0");
        assert_eq!(hex_float(2.0), "0x1p+1");
        assert_eq!(hex_float(3.0), "0x1.8p+1");
        assert_eq!(hex_float(0.25), "0x1p-2");
        assert_eq!(hex_float(-1.5), "-0x1.8p+0");
    }

    #[test]
    fn test_instruction_formatting() {
        let mut asm = Assembly::new();
        asm.defvar("GF@$1");
        asm.move_symb("GF@$1", "int@5");
        asm.pushs("GF@$1");
        asm.jumpifeq("$target", "GF@$1", "nil@nil");

        let text = asm.finish();
        assert!(text.contains("DEFVAR GF@$1\n"));
        assert!(text.contains("MOVE GF@$1 int@5\n"));
        assert!(text.contains("JUMPIFEQ $target GF@$1 nil@nil\n"));
    }
}
