// ayc-vm - End-to-end execution tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

mod common;

use ayc_vm::compiler::{CompileError, Emitter};
use common::*;

#[test]
fn test_constant_expression() {
    assert_eq!(run("let x = 2 + 3 * 4 print x"), "PRINT: 14\n");
}

#[test]
fn test_reassignment() {
    assert_eq!(run("let x = 10 x = x - 3 print x"), "PRINT: 7\n");
}

#[test]
fn test_function_call() {
    let src = "def add(a: int, b: int) -> int { return a + b } print add(4, 5)";
    assert_eq!(run(src), "PRINT: 9\n");
}

#[test]
fn test_if_else() {
    assert_eq!(
        run("if 1 == 1 { print 42 } else { print 0 }"),
        "PRINT: 42\n"
    );
    assert_eq!(
        run("if 1 == 2 { print 42 } else { print 0 }"),
        "PRINT: 0\n"
    );
}

#[test]
fn test_recursive_factorial() {
    let src = "def fact(n: int) -> int { \
               if n == 0 { return 1 } else { return n * fact(n - 1) } } \
               print fact(5)";
    assert_eq!(run(src), "PRINT: 120\n");
}

#[test]
fn test_input_doubling() {
    let src = r#"let n = input("enter") print n * 2"#;
    assert_eq!(run_source(src, "7\n").unwrap(), "enter: PRINT: 14\n");
}

#[test]
fn test_input_str() {
    let src = r#"let s = input_str("name") print "hello " + s"#;
    assert_eq!(
        run_source(src, "world\n").unwrap(),
        "name: PRINT: hello world\n"
    );
}

#[test]
fn test_division_by_zero_is_fatal() {
    let err = run_source("print 1 / 0", "").unwrap_err();
    assert!(err.contains("ArithmeticError"), "got: {}", err);
    let err = run_source("print 1 % 0", "").unwrap_err();
    assert!(err.contains("ArithmeticError"), "got: {}", err);
}

#[test]
fn test_undeclared_function_is_fatal() {
    let err = try_compile("print foo(1)").unwrap_err();
    assert!(err.contains("NameError"), "got: {}", err);
}

#[test]
fn test_undeclared_variable_is_fatal() {
    let err = try_compile("print x").unwrap_err();
    assert!(err.contains("NameError"), "got: {}", err);
}

#[test]
fn test_register_exhaustion_is_a_clean_error() {
    // Registers are never reused, so 300 distinct bindings overflow the
    // 256-slot register file.
    let src: String = (0..300).map(|i| format!("let v{} = {} ", i, i)).collect();
    let err = Emitter::new().emit_program(&parse(&src)).unwrap_err();
    assert!(
        matches!(err, CompileError::RegisterExhaustion),
        "got: {}",
        err
    );
}

#[test]
fn test_recursion_depth_1000() {
    let src = "def count(n: int) -> int { \
               if n == 0 { return 0 } else { return count(n - 1) } } \
               print count(1000)";
    assert_eq!(run(src), "PRINT: 0\n");
}

#[test]
fn test_string_concatenation() {
    assert_eq!(run(r#"print "a" + "b""#), "PRINT: ab\n");
}

#[test]
fn test_string_subtraction_is_type_error() {
    let err = run_source(r#"print "a" - "b""#, "").unwrap_err();
    assert!(err.contains("TypeError"), "got: {}", err);
}

#[test]
fn test_string_equality_is_lexicographic() {
    assert_eq!(run(r#"let s = "abc" print s == "abc""#), "PRINT: 1\n");
    assert_eq!(run(r#"print "abc" < "abd""#), "PRINT: 1\n");
    assert_eq!(run(r#"print "b" < "a""#), "PRINT: 0\n");
}

#[test]
fn test_for_loop() {
    assert_eq!(
        run("for (let i = 0; i < 3; i = i + 1) { print i }"),
        "PRINT: 0\nPRINT: 1\nPRINT: 2\n"
    );
}

#[test]
fn test_for_loop_never_entered() {
    assert_eq!(run("for (let i = 5; i < 3; i = i + 1) { print i }"), "");
}

#[test]
fn test_unary_operators() {
    assert_eq!(run("print -5 + 3"), "PRINT: -2\n");
    assert_eq!(run("print ~0"), "PRINT: -1\n");
    assert_eq!(run("print !0"), "PRINT: 1\n");
    assert_eq!(run("print !7"), "PRINT: 0\n");
}

#[test]
fn test_bitwise_operators() {
    assert_eq!(run("print 6 & 3"), "PRINT: 2\n");
    assert_eq!(run("print 6 | 3"), "PRINT: 7\n");
    assert_eq!(run("print 6 ^ 3"), "PRINT: 5\n");
    assert_eq!(run("print 1 << 4"), "PRINT: 16\n");
    assert_eq!(run("print 16 >> 2"), "PRINT: 4\n");
}

#[test]
fn test_logical_operators() {
    assert_eq!(run("print 1 == 1 && 2 == 2"), "PRINT: 1\n");
    assert_eq!(run("print 1 == 1 and 2 == 3"), "PRINT: 0\n");
    assert_eq!(run("print 1 == 2 || 3 == 3"), "PRINT: 1\n");
}

#[test]
fn test_booleans_print_as_integers() {
    assert_eq!(run("print true"), "PRINT: 1\n");
    assert_eq!(run("print false"), "PRINT: 0\n");
}

#[test]
fn test_function_without_explicit_return_yields_zero() {
    let src = "def shout(x: int) -> void { print x } let r = shout(3) print r";
    assert_eq!(run(src), "PRINT: 3\nPRINT: 0\n");
}

#[test]
fn test_nested_calls_preserve_return_values() {
    let src = "def add(a: int, b: int) -> int { return a + b } \
               print add(add(1, 2), add(3, 4))";
    assert_eq!(run(src), "PRINT: 10\n");
}

#[test]
fn test_call_does_not_clobber_caller_locals() {
    let src = "def double(n: int) -> int { return n * 2 } \
               let x = 5 let y = double(3) print x print y";
    assert_eq!(run(src), "PRINT: 5\nPRINT: 6\n");
}

#[test]
fn test_mutual_recursion_forward_call() {
    let src = "def is_even(n: int) -> int { \
               if n == 0 { return 1 } else { return is_odd(n - 1) } } \
               def is_odd(n: int) -> int { \
               if n == 0 { return 0 } else { return is_even(n - 1) } } \
               print is_even(10)";
    assert_eq!(run(src), "PRINT: 1\n");
}

#[test]
fn test_top_level_code_does_not_run_function_bodies() {
    // Function bodies sit between the entry jump and __begin; only an
    // explicit call may reach them.
    let src = "def noisy() -> void { print 999 } print 1";
    assert_eq!(run(src), "PRINT: 1\n");
}

#[test]
fn test_integer_wraparound() {
    assert_eq!(
        run("let x = 9223372036854775807 print x + 1"),
        format!("PRINT: {}\n", i64::MIN)
    );
}

#[test]
fn test_end_of_input_is_fatal() {
    let err = run_source(r#"let n = input("n") print n"#, "").unwrap_err();
    assert!(err.contains("RuntimeError"), "got: {}", err);
}

#[test]
fn test_non_integer_input_is_fatal() {
    let err = run_source(r#"let n = input("n") print n"#, "abc\n").unwrap_err();
    assert!(err.contains("invalid input"), "got: {}", err);
}
