// ayc-vm - Bytecode compiler and virtual machine for the ayc programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # ayc-vm
//!
//! Bytecode compiler and register-oriented virtual machine for ayc.
//! An AST from `ayc-parser` is optionally constant-folded, lowered to a
//! linear instruction sequence, and executed (or serialized to a
//! `.aycb` file and executed later).

pub mod bytecode;
pub mod compiler;
pub mod opcode;
pub mod program;
pub mod vm;

pub use bytecode::BytecodeError;
pub use compiler::{CompileError, Emitter, Folder};
pub use opcode::Opcode;
pub use program::{Instruction, Operand, Program, Value, REGISTER_FILE_SIZE, RV};
pub use vm::{RuntimeError, Vm};
