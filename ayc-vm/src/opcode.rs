// ayc-vm - Bytecode compiler and virtual machine for the ayc programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode instruction definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bytecode opcodes for the ayc VM.
///
/// Instructions operate on a register file. Operand arity is fixed per
/// opcode; see [`crate::program::Instruction`]. The enumeration order is
/// part of the `.aycb` on-disk contract and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    // =========================================================================
    // Data movement
    // =========================================================================
    /// Copy the first operand (register or literal) into the second (register).
    Mov,

    /// Load a symbol-store entry or literal into a register.
    Load,

    /// Store a register into a named symbol-store entry.
    Store,

    // =========================================================================
    // Arithmetic (r3 <- r1 op r2)
    // =========================================================================
    /// Addition; concatenation when both operands are strings.
    Add,

    /// Subtraction.
    Sub,

    /// Multiplication.
    Mul,

    /// Division. Division by zero is fatal.
    Div,

    /// Modulus. Modulus by zero is fatal.
    Mod,

    // =========================================================================
    // Bitwise (r3 <- r1 op r2, except the unary forms)
    // =========================================================================
    /// Bitwise and.
    Band,

    /// Bitwise or.
    Bor,

    /// Bitwise xor.
    Bxor,

    /// Shift left.
    Lshift,

    /// Shift right.
    Rshift,

    /// Bitwise complement: r2 <- ~r1.
    Bnot,

    /// Logical negation: r2 <- (r1 == 0 ? 1 : 0).
    Not,

    // =========================================================================
    // Control flow
    // =========================================================================
    /// Unconditional jump to a label.
    Jmp,

    /// Jump if the two registers compare equal.
    JmpIf,

    /// Jump if the register is zero.
    Jnt,

    /// Jump if the two registers compare unequal.
    Jne,

    /// Jump if r1 > r2 (signed).
    Jgt,

    /// Jump if r1 >= r2 (signed).
    Jge,

    /// Jump if r1 < r2 (signed).
    Jlt,

    /// Jump if r1 <= r2 (signed).
    Jle,

    /// Pseudo-op marking a jump target. Resolved to an offset at load
    /// time; executing it advances the program counter like any other
    /// instruction.
    Label,

    // =========================================================================
    // Data stack and calls
    // =========================================================================
    /// Push a register or literal onto the data stack.
    Push,

    /// Pop the data stack into a register.
    Pop,

    /// Push the return address onto the call stack and jump to a label.
    Fncall,

    /// Pop the call stack and jump to the popped return address.
    Ret,

    // =========================================================================
    // System
    // =========================================================================
    /// Invoke a built-in service. The first operand selects it
    /// ([`Opcode::Print`], [`Opcode::Input`], [`Opcode::InputStr`]).
    Syscall,

    /// Terminate execution.
    Halt,

    /// Do nothing.
    Nop,

    // =========================================================================
    // Syscall selectors (only valid as SYSCALL's first operand)
    // =========================================================================
    /// Write a value to standard output.
    Print,

    /// Prompt and read one whitespace-delimited integer token.
    Input,

    /// Prompt and read one whitespace-delimited string token.
    InputStr,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Opcode::Mov => "MOV",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Band => "BAND",
            Opcode::Bor => "BOR",
            Opcode::Bxor => "BXOR",
            Opcode::Lshift => "LSHIFT",
            Opcode::Rshift => "RSHIFT",
            Opcode::Bnot => "BNOT",
            Opcode::Not => "NOT",
            Opcode::Jmp => "JMP",
            Opcode::JmpIf => "JMP_IF",
            Opcode::Jnt => "JNT",
            Opcode::Jne => "JNE",
            Opcode::Jgt => "JGT",
            Opcode::Jge => "JGE",
            Opcode::Jlt => "JLT",
            Opcode::Jle => "JLE",
            Opcode::Label => "LABEL",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Fncall => "FNCALL",
            Opcode::Ret => "RET",
            Opcode::Syscall => "SYSCALL",
            Opcode::Halt => "HALT",
            Opcode::Nop => "NOP",
            Opcode::Print => "PRINT",
            Opcode::Input => "INPUT",
            Opcode::InputStr => "INPUTSTR",
        };
        write!(f, "{}", s)
    }
}

impl Opcode {
    /// Returns true if this instruction transfers control (jump, call, return).
    #[inline]
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            Opcode::Jmp
                | Opcode::JmpIf
                | Opcode::Jnt
                | Opcode::Jne
                | Opcode::Jgt
                | Opcode::Jge
                | Opcode::Jlt
                | Opcode::Jle
                | Opcode::Fncall
                | Opcode::Ret
        )
    }

    /// Returns true for the syscall selector opcodes.
    #[inline]
    pub fn is_syscall_selector(&self) -> bool {
        matches!(self, Opcode::Print | Opcode::Input | Opcode::InputStr)
    }
}
