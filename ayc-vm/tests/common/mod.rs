// ayc-vm - Common test utilities
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared helpers for ayc-vm integration tests.
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use std::io::Cursor;

use ayc_parser::ast;
use ayc_parser::Parser;
use ayc_vm::compiler::{Emitter, Folder};
use ayc_vm::{Program, Vm};

/// Parse source text into an AST.
#[allow(dead_code)]
pub fn parse(src: &str) -> ast::Program {
    Parser::new(src)
        .expect("lex error")
        .parse_program()
        .expect("parse error")
}

/// Compile source without the folding pass.
#[allow(dead_code)]
pub fn try_compile(src: &str) -> Result<Program, String> {
    let mut parser = Parser::new(src).map_err(|e| e.to_string())?;
    let ast = parser.parse_program().map_err(|e| e.to_string())?;
    Emitter::new().emit_program(&ast).map_err(|e| e.to_string())
}

/// Compile source with the folding pass.
#[allow(dead_code)]
pub fn try_compile_folded(src: &str) -> Result<Program, String> {
    let mut parser = Parser::new(src).map_err(|e| e.to_string())?;
    let ast = parser.parse_program().map_err(|e| e.to_string())?;
    let ast = Folder::new().fold_program(ast).map_err(|e| e.to_string())?;
    Emitter::new().emit_program(&ast).map_err(|e| e.to_string())
}

/// Compile source, panicking on failure.
#[allow(dead_code)]
pub fn compile(src: &str) -> Program {
    try_compile(src).expect("compile error")
}

/// Execute a program against the given input, capturing its output.
#[allow(dead_code)]
pub fn run_program(program: Program, input: &str) -> Result<String, String> {
    let mut out = Vec::new();
    let result = {
        let mut vm = Vm::with_io(program, Cursor::new(input.as_bytes().to_vec()), &mut out);
        vm.run()
    };
    result.map_err(|e| e.to_string())?;
    Ok(String::from_utf8(out).expect("output is not UTF-8"))
}

/// Compile without folding and run against the given input.
#[allow(dead_code)]
pub fn run_source(src: &str, input: &str) -> Result<String, String> {
    run_program(try_compile(src)?, input)
}

/// Compile with folding and run against the given input.
#[allow(dead_code)]
pub fn run_source_folded(src: &str, input: &str) -> Result<String, String> {
    run_program(try_compile_folded(src)?, input)
}

/// Compile and run with no input, panicking on any failure.
#[allow(dead_code)]
pub fn run(src: &str) -> String {
    run_source(src, "").expect("execution error")
}
