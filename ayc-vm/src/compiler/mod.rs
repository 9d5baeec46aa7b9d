// ayc-vm - Bytecode compiler and virtual machine for the ayc programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: transforms an ayc AST into a bytecode program.
//!
//! The compiler has two pieces:
//! 1. Folding (optional): rewrite constant sub-expressions to literals
//! 2. Code generation: lower the AST to a linear instruction sequence

pub mod analysis;
pub mod codegen;

pub use analysis::Folder;
pub use codegen::Emitter;

/// Error during analysis or code generation.
#[derive(Debug, Clone)]
pub enum CompileError {
    /// A variable was referenced before any `let` bound it.
    UndeclaredVariable(String),
    /// A call names a function with no definition in the program.
    UndeclaredFunction(String),
    /// An operator was applied to an operand kind it is not defined for.
    TypeMismatch { op: String, operand: String },
    /// Division or modulus by a constant zero.
    DivisionByZero,
    /// The emitter ran out of registers.
    RegisterExhaustion,
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::UndeclaredVariable(name) => {
                write!(f, "NameError: variable {} used before declaration", name)
            }
            CompileError::UndeclaredFunction(name) => {
                write!(f, "NameError: function {} used before declaration", name)
            }
            CompileError::TypeMismatch { op, operand } => {
                write!(f, "TypeError: operator {} not defined for {}", op, operand)
            }
            CompileError::DivisionByZero => {
                write!(f, "ArithmeticError: division or modulus by zero")
            }
            CompileError::RegisterExhaustion => {
                write!(f, "RegisterExhaustion: out of registers")
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
