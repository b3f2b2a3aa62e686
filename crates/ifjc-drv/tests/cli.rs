//! End-to-end exit-code tests through the binary: source on stdin,
//! assembly on stdout, diagnostic on stderr, exit code by error
//! class.

use assert_cmd::Command;
use predicates::prelude::*;

fn ifjc() -> Command {
    Command::cargo_bin("ifjc").expect("binary builds")
}

#[test]
fn success_emits_assembly_and_exits_zero() {
    ifjc()
        .write_stdin("let a = 7\nlet b: Int = a\nwrite(b)")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(".IFJcode23"))
        .stdout(predicate::str::contains("WRITE"));
}

#[test]
fn empty_program_compiles() {
    ifjc()
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(".IFJcode23"));
}

#[test]
fn lexical_error_exits_1() {
    ifjc()
        .write_stdin("let a = \"unterminated")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn unmatched_comment_exits_1() {
    ifjc().write_stdin("*/").assert().code(1);
}

#[test]
fn syntax_error_exits_2() {
    ifjc().write_stdin("let a = 1;\nlet b = 2").assert().code(2);
    ifjc().write_stdin("func f( {\n}").assert().code(2);
    ifjc().write_stdin("let a = 1 let b = 2").assert().code(2);
}

#[test]
fn undefined_function_exits_3() {
    ifjc().write_stdin("missing()").assert().code(3);
}

#[test]
fn redeclaration_exits_3() {
    ifjc().write_stdin("let a = 1\nlet a = 2").assert().code(3);
    ifjc()
        .write_stdin("func f() {\n}\nfunc f() {\n}")
        .assert()
        .code(3);
    ifjc()
        .write_stdin("let f = 1\nfunc f() {\n}")
        .assert()
        .code(3);
}

#[test]
fn call_type_mismatch_exits_4() {
    ifjc()
        .write_stdin("func f(_ x: Int) {\n}\nf(\"text\")")
        .assert()
        .code(4);
    ifjc()
        .write_stdin("func f(_ x: Int) {\n}\nf(1, 2)")
        .assert()
        .code(4);
}

#[test]
fn return_type_mismatch_exits_4() {
    ifjc()
        .write_stdin("func f() -> Int {\n return \"no\" \n}")
        .assert()
        .code(4);
}

#[test]
fn uninitialized_variable_exits_5() {
    ifjc()
        .write_stdin("let a: Int\nlet b: Int = a")
        .assert()
        .code(5);
}

#[test]
fn undefined_variable_exits_5() {
    ifjc().write_stdin("let a = missing").assert().code(5);
}

#[test]
fn missing_return_value_exits_6() {
    ifjc()
        .write_stdin("func f() -> Int {\n return \n}")
        .assert()
        .code(6);
}

#[test]
fn unreachable_return_exits_6() {
    ifjc()
        .write_stdin("func f() -> Int {\n if true { return 1 }\n}")
        .assert()
        .code(6);
}

#[test]
fn extraneous_return_value_exits_6() {
    ifjc()
        .write_stdin("func f() {\n return 1 \n}")
        .assert()
        .code(6);
}

#[test]
fn arithmetic_type_error_exits_7() {
    ifjc().write_stdin("let a = 1 + \"x\"").assert().code(7);
    ifjc()
        .write_stdin("var d: Double = 1.0\nvar i: Int = 1\nlet x = d + i")
        .assert()
        .code(7);
}

#[test]
fn inference_failure_exits_8() {
    ifjc().write_stdin("let a = nil").assert().code(8);
}

#[test]
fn ambiguous_overload_exits_9() {
    let source = "func f() -> Int {\n return 1 \n}\n\
                  func f() -> Double {\n return 1.5 \n}\n\
                  func g() -> Int {\n return 1 \n}\n\
                  func g() -> Double {\n return 1.5 \n}\n\
                  let v = f() + g()";
    ifjc().write_stdin(source).assert().code(9);
}

#[test]
fn constant_reassignment_exits_9() {
    ifjc().write_stdin("let a = 1\na = 2").assert().code(9);
}

#[test]
fn bad_argument_label_exits_9() {
    ifjc()
        .write_stdin("func f(with x: Int) {\n}\nf(1)")
        .assert()
        .code(9);
}

#[test]
fn overload_on_return_type_selected_by_context() {
    // The Double overload wins under a Double annotation, and the
    // Int literal 5 is promoted.
    let source = "func f() -> Int {\n return 1 \n}\n\
                  func f() -> Double {\n return 1.5 \n}\n\
                  let v: Double = f() + 5";
    ifjc()
        .write_stdin(source)
        .assert()
        .success()
        .stdout(predicate::str::contains("PUSHS float@0x1.4p+2"));
}

#[test]
fn optional_binding_program_compiles() {
    let source = "var a: Int? = nil\nif let a {\n var b: Int = a\n write(b)\n}";
    ifjc().write_stdin(source).assert().success();
}

#[test]
fn interpolation_program_compiles() {
    let source = "let n = 6\nlet s = \"value: \\(n * 7)\"\nwrite(s)";
    ifjc()
        .write_stdin(source)
        .assert()
        .success()
        .stdout(predicate::str::contains("CONCAT"));
}

#[test]
fn full_program_compiles() {
    let source = "\
func fact(_ n: Int) -> Int {
    if n < 2 {
        return 1
    }
    return n * fact(n - 1)
}

var total = 0
for i in 1...5 {
    total = total + fact(i)
}
write(\"total: \", total, \"\\n\")";

    ifjc()
        .write_stdin(source)
        .assert()
        .success()
        .stdout(predicate::str::contains("CALL $fn_"));
}
