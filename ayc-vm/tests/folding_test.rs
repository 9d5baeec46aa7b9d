// ayc-vm - Constant folding tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

mod common;

use ayc_parser::ast::{Expr, Stmt};
use ayc_vm::compiler::Folder;
use common::*;

fn fold(src: &str) -> ayc_parser::ast::Program {
    Folder::new()
        .fold_program(parse(src))
        .expect("fold error")
}

fn try_fold(src: &str) -> Result<ayc_parser::ast::Program, String> {
    Folder::new()
        .fold_program(parse(src))
        .map_err(|e| e.to_string())
}

#[test]
fn test_folds_arithmetic() {
    let program = fold("let x = 2 + 3 * 4");
    assert_eq!(
        program.statements[0],
        Stmt::Let {
            name: "x".to_string(),
            value: Expr::Int(14),
        }
    );
}

#[test]
fn test_substitutes_bound_constants() {
    let program = fold("let x = 2 let y = x + 1");
    assert_eq!(
        program.statements[1],
        Stmt::Let {
            name: "y".to_string(),
            value: Expr::Int(3),
        }
    );
}

#[test]
fn test_reassignment_updates_binding() {
    let program = fold("let x = 1 x = 2 let y = x + 10");
    assert_eq!(
        program.statements[2],
        Stmt::Let {
            name: "y".to_string(),
            value: Expr::Int(12),
        }
    );
}

#[test]
fn test_dynamic_values_are_not_folded() {
    let program = fold(r#"let n = input("p") let y = n + 1"#);
    assert!(matches!(
        &program.statements[1],
        Stmt::Let {
            value: Expr::Binary { .. },
            ..
        }
    ));
}

#[test]
fn test_collapses_true_conditional() {
    let program = fold("if 1 == 1 { print 42 } else { print 0 }");
    assert_eq!(program.statements, vec![Stmt::Print(Expr::Int(42))]);
}

#[test]
fn test_collapses_false_conditional() {
    let program = fold("if 1 == 2 { print 42 } else { print 0 }");
    assert_eq!(program.statements, vec![Stmt::Print(Expr::Int(0))]);
}

#[test]
fn test_collapses_false_conditional_without_else() {
    let program = fold("if 1 == 2 { print 42 } print 7");
    assert_eq!(program.statements, vec![Stmt::Print(Expr::Int(7))]);
}

#[test]
fn test_dynamic_conditional_passes_through() {
    let program = fold(r#"let n = input("p") if n == 1 { print 1 }"#);
    assert!(matches!(&program.statements[1], Stmt::If { .. }));
}

#[test]
fn test_parameters_are_declared_but_dynamic() {
    let program = fold("def f(a: int) -> int { return a + 1 }");
    match &program.statements[0] {
        Stmt::FuncDef(def) => {
            assert!(matches!(
                &def.body.statements[0],
                Stmt::Return(Expr::Binary { .. })
            ));
        }
        other => panic!("expected def, got {:?}", other),
    }
}

#[test]
fn test_function_definition_survives_folding() {
    // Constant bodies fold inside the definition, not into the
    // top-level statement list.
    let program = fold("def f() -> int { return 2 + 3 } print f()");
    match &program.statements[0] {
        Stmt::FuncDef(def) => {
            assert_eq!(def.body.statements, vec![Stmt::Return(Expr::Int(5))]);
        }
        other => panic!("expected def, got {:?}", other),
    }
}

#[test]
fn test_undeclared_variable_in_fold_is_fatal() {
    let err = try_fold("let y = z + 1").unwrap_err();
    assert!(err.contains("variable z used before declaration"), "got: {}", err);
}

#[test]
fn test_reassignment_of_undeclared_variable_is_fatal() {
    let err = try_fold("x = 1").unwrap_err();
    assert!(err.contains("NameError"), "got: {}", err);
}

#[test]
fn test_call_to_undeclared_function_is_fatal() {
    let err = try_fold("print g(1)").unwrap_err();
    assert!(err.contains("function g used before declaration"), "got: {}", err);
}

#[test]
fn test_constant_division_by_zero_is_fatal() {
    let err = try_fold("let x = 1 / 0").unwrap_err();
    assert!(err.contains("ArithmeticError"), "got: {}", err);
}

#[test]
fn test_string_folding() {
    let program = fold(r#"let s = "a" + "b""#);
    assert_eq!(
        program.statements[0],
        Stmt::Let {
            name: "s".to_string(),
            value: Expr::Str("ab".to_string()),
        }
    );
    let err = try_fold(r#"let s = "a" - "b""#).unwrap_err();
    assert!(err.contains("TypeError"), "got: {}", err);
}

#[test]
fn test_string_comparison_folds_lexicographically() {
    let program = fold(r#"let b = "abc" < "abd""#);
    assert_eq!(
        program.statements[0],
        Stmt::Let {
            name: "b".to_string(),
            value: Expr::Bool(true),
        }
    );
}

#[test]
fn test_boolean_folding() {
    let program = fold("let a = true && false let b = !true let c = 1 < 2");
    assert_eq!(
        program.statements,
        vec![
            Stmt::Let {
                name: "a".to_string(),
                value: Expr::Bool(false),
            },
            Stmt::Let {
                name: "b".to_string(),
                value: Expr::Bool(false),
            },
            Stmt::Let {
                name: "c".to_string(),
                value: Expr::Bool(true),
            },
        ]
    );
}

#[test]
fn test_unary_folding() {
    let program = fold("let x = -(2 + 3) let y = ~7");
    assert_eq!(
        program.statements,
        vec![
            Stmt::Let {
                name: "x".to_string(),
                value: Expr::Int(-5),
            },
            Stmt::Let {
                name: "y".to_string(),
                value: Expr::Int(-8),
            },
        ]
    );
}

#[test]
fn test_folding_is_idempotent() {
    let src = r#"
        let a = 1 + 2
        let b = a * 3
        let n = input("p")
        if n == 1 { print b } else { print a }
        def f(x: int) -> int { return x + a }
        print f(4)
    "#;
    let once = Folder::new().fold_program(parse(src)).unwrap();
    let twice = Folder::new().fold_program(once.clone()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_folding_preserves_observable_output() {
    let cases = [
        "let x = 2 + 3 * 4 print x",
        "let x = 10 x = x - 3 print x",
        "if 1 == 1 { print 42 } else { print 0 }",
        "def fact(n: int) -> int { if n == 0 { return 1 } else { return n * fact(n - 1) } } print fact(5)",
        r#"print "a" + "b""#,
        "for (let i = 0; i < 3; i = i + 1) { print i * 2 }",
        "print 7 & 3 print 1 << 3 print -4",
    ];
    for src in cases {
        let unfolded = run_source(src, "").unwrap();
        let folded = run_source_folded(src, "").unwrap();
        assert_eq!(unfolded, folded, "outputs diverge for: {}", src);
    }
}

#[test]
fn test_folding_preserves_output_with_input() {
    let src = r#"let n = input("enter") print n * 2"#;
    assert_eq!(
        run_source(src, "7\n").unwrap(),
        run_source_folded(src, "7\n").unwrap()
    );
}
