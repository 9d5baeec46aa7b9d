// ayc-vm - Bytecode compiler and virtual machine for the ayc programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code generation: lowers the AST to a linear instruction sequence.
//!
//! Program layout: an initial `JMP __begin`, then every function body,
//! then the `__begin` label, the top-level statements, and a terminal
//! `HALT`. Top-level code can never fall through into a function body.

use std::collections::HashMap;

use tracing::debug;

use ayc_parser::ast::{BinOp, Block, Expr, FuncDef, Program as Ast, Stmt, UnOp};

use crate::opcode::Opcode;
use crate::program::{Instruction, Operand, Program, Value, REGISTER_FILE_SIZE, RV};

use super::{CompileError, Result};

/// Entry label of the top-level statement sequence.
const BEGIN_LABEL: &str = "__begin";

/// The bytecode emitter.
///
/// Registers are handed out from a monotonically increasing counter
/// (register 0 is reserved for the return value) and never reused;
/// temporaries are allocated under synthetic names so they cannot
/// collide with user variables.
pub struct Emitter {
    instructions: Vec<Instruction>,
    next_register: usize,
    label_counter: usize,
    temp_counter: usize,
    registers: HashMap<String, usize>,
    functions: HashMap<String, String>,
    /// Non-zero while emitting a loop's condition, body or step.
    loop_depth: usize,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter {
            instructions: Vec::new(),
            next_register: 1,
            label_counter: 0,
            temp_counter: 0,
            registers: HashMap::new(),
            functions: HashMap::new(),
            loop_depth: 0,
        }
    }

    /// Lower a whole program.
    pub fn emit_program(mut self, ast: &Ast) -> Result<Program> {
        // Register every function first so forward calls resolve.
        for stmt in &ast.statements {
            if let Stmt::FuncDef(def) = stmt {
                self.functions
                    .insert(def.name.clone(), function_label(&def.name));
            }
        }

        self.emit(Opcode::Jmp, vec![Operand::Label(BEGIN_LABEL.to_string())]);
        for stmt in &ast.statements {
            if let Stmt::FuncDef(def) = stmt {
                self.emit_func_def(def)?;
            }
        }
        self.emit_label(BEGIN_LABEL.to_string());
        for stmt in &ast.statements {
            if !matches!(stmt, Stmt::FuncDef(_)) {
                self.emit_stmt(stmt)?;
            }
        }
        self.emit(Opcode::Halt, vec![]);
        Ok(Program::new(self.instructions))
    }

    fn emit_func_def(&mut self, def: &FuncDef) -> Result<()> {
        debug!(name = %def.name, params = def.params.len(), "emitting function");
        let label = function_label(&def.name);
        self.emit_label(label);

        // Arguments were pushed in reverse, so popping in declared order
        // receives them correctly.
        for param in &def.params {
            let reg = self.alloc_register(&param.name)?;
            self.emit(Opcode::Pop, vec![Operand::Reg(reg)]);
        }

        let mut terminated = false;
        for stmt in &def.body.statements {
            self.emit_stmt(stmt)?;
            if matches!(stmt, Stmt::Return(_)) {
                // Anything after a top-level return is unreachable.
                terminated = true;
                break;
            }
        }
        if !terminated {
            self.emit(
                Opcode::Mov,
                vec![Operand::Lit(Value::Int(0)), Operand::Reg(RV)],
            );
            self.emit(Opcode::Ret, vec![]);
        }
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Let { name, value } => {
                // The value is already in a register; just record the binding.
                let reg = self.emit_expr(value)?;
                self.registers.insert(name.clone(), reg);
            }
            Stmt::Assign { name, value } => {
                let value_reg = self.emit_expr(value)?;
                // Inside a loop the variable must keep a stable home
                // register: the back edge re-runs instructions that were
                // emitted against the current binding.
                let reg = match self.registers.get(name) {
                    Some(&home) if self.loop_depth > 0 => {
                        self.emit(
                            Opcode::Mov,
                            vec![Operand::Reg(value_reg), Operand::Reg(home)],
                        );
                        home
                    }
                    _ => {
                        self.registers.insert(name.clone(), value_reg);
                        value_reg
                    }
                };
                // Also update the symbol store so restored programs keep
                // assignment side effects.
                self.emit(
                    Opcode::Store,
                    vec![Operand::Reg(reg), Operand::Label(name.clone())],
                );
            }
            Stmt::Print(value) => {
                let reg = self.emit_expr(value)?;
                self.emit(
                    Opcode::Syscall,
                    vec![Operand::Sys(Opcode::Print), Operand::Reg(reg)],
                );
            }
            Stmt::Return(value) => {
                let reg = self.emit_expr(value)?;
                self.emit(Opcode::Mov, vec![Operand::Reg(reg), Operand::Reg(RV)]);
                self.emit(Opcode::Ret, vec![]);
            }
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                let cond_reg = self.emit_expr(cond)?;
                let else_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.emit(
                    Opcode::Jnt,
                    vec![Operand::Reg(cond_reg), Operand::Label(else_label.clone())],
                );
                self.emit_block(then_block)?;
                self.emit(Opcode::Jmp, vec![Operand::Label(end_label.clone())]);
                self.emit_label(else_label);
                if let Some(else_block) = else_block {
                    self.emit_block(else_block)?;
                }
                self.emit_label(end_label);
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                self.emit_stmt(init)?;
                let top_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.loop_depth += 1;
                self.emit_label(top_label.clone());
                let cond_reg = self.emit_expr(cond)?;
                self.emit(
                    Opcode::Jnt,
                    vec![Operand::Reg(cond_reg), Operand::Label(end_label.clone())],
                );
                self.emit_block(body)?;
                self.emit_stmt(step)?;
                self.emit(Opcode::Jmp, vec![Operand::Label(top_label)]);
                self.emit_label(end_label);
                self.loop_depth -= 1;
            }
            // Function bodies are emitted by emit_program; the parser
            // rejects nested definitions.
            Stmt::FuncDef(_) => {}
            Stmt::Expr(expr) => {
                self.emit_expr(expr)?;
            }
        }
        Ok(())
    }

    fn emit_block(&mut self, block: &Block) -> Result<()> {
        for stmt in &block.statements {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    /// Lower an expression; returns the register holding its value.
    fn emit_expr(&mut self, expr: &Expr) -> Result<usize> {
        match expr {
            Expr::Int(n) => self.emit_literal(Value::Int(*n)),
            Expr::Str(s) => self.emit_literal(Value::Str(s.clone())),
            Expr::Bool(b) => self.emit_literal(Value::Int(*b as i64)),
            Expr::Ident(name) => match self.registers.get(name) {
                Some(&reg) => Ok(reg),
                None => {
                    debug!(map = ?self.registers, "identifier not in register map");
                    Err(CompileError::UndeclaredVariable(name.clone()))
                }
            },
            Expr::Unary { op, operand } => self.emit_unary(*op, operand),
            Expr::Binary { op, lhs, rhs } => self.emit_binary(*op, lhs, rhs),
            Expr::Call { callee, args, .. } => self.emit_call(callee, args),
            Expr::InputInt { prompt } => self.emit_input(Opcode::Input, prompt),
            Expr::InputStr { prompt } => self.emit_input(Opcode::InputStr, prompt),
        }
    }

    fn emit_literal(&mut self, value: Value) -> Result<usize> {
        let reg = self.alloc_temp()?;
        self.emit(Opcode::Mov, vec![Operand::Lit(value), Operand::Reg(reg)]);
        Ok(reg)
    }

    fn emit_unary(&mut self, op: UnOp, operand: &Expr) -> Result<usize> {
        let operand_reg = self.emit_expr(operand)?;
        match op {
            // There is no NEG opcode; negation is a subtraction from zero.
            UnOp::Neg => {
                let zero = self.emit_literal(Value::Int(0))?;
                let out = self.alloc_temp()?;
                self.emit(
                    Opcode::Sub,
                    vec![
                        Operand::Reg(zero),
                        Operand::Reg(operand_reg),
                        Operand::Reg(out),
                    ],
                );
                Ok(out)
            }
            UnOp::Not => {
                let out = self.alloc_temp()?;
                self.emit(
                    Opcode::Not,
                    vec![Operand::Reg(operand_reg), Operand::Reg(out)],
                );
                Ok(out)
            }
            UnOp::BitNot => {
                let out = self.alloc_temp()?;
                self.emit(
                    Opcode::Bnot,
                    vec![Operand::Reg(operand_reg), Operand::Reg(out)],
                );
                Ok(out)
            }
        }
    }

    fn emit_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<usize> {
        let lhs_reg = self.emit_expr(lhs)?;
        let rhs_reg = self.emit_expr(rhs)?;

        if op.is_comparison() {
            // Comparisons materialise 0 or 1 through a conditional jump.
            let true_label = self.fresh_label();
            let end_label = self.fresh_label();
            let out = self.alloc_temp()?;
            self.emit(
                comparison_opcode(op),
                vec![
                    Operand::Reg(lhs_reg),
                    Operand::Reg(rhs_reg),
                    Operand::Label(true_label.clone()),
                ],
            );
            self.emit(
                Opcode::Mov,
                vec![Operand::Lit(Value::Int(0)), Operand::Reg(out)],
            );
            self.emit(Opcode::Jmp, vec![Operand::Label(end_label.clone())]);
            self.emit_label(true_label);
            self.emit(
                Opcode::Mov,
                vec![Operand::Lit(Value::Int(1)), Operand::Reg(out)],
            );
            self.emit_label(end_label);
            return Ok(out);
        }

        let out = self.alloc_temp()?;
        self.emit(
            arithmetic_opcode(op),
            vec![
                Operand::Reg(lhs_reg),
                Operand::Reg(rhs_reg),
                Operand::Reg(out),
            ],
        );
        Ok(out)
    }

    fn emit_call(&mut self, callee: &str, args: &[Expr]) -> Result<usize> {
        let label = self
            .functions
            .get(callee)
            .cloned()
            .ok_or_else(|| CompileError::UndeclaredFunction(callee.to_string()))?;

        let arg_regs = args
            .iter()
            .map(|arg| self.emit_expr(arg))
            .collect::<Result<Vec<_>>>()?;

        // The register map is flat, so the callee's pops and moves would
        // clobber this frame's values; save every allocated register
        // across the call.
        let saved: Vec<usize> = (1..self.next_register).collect();
        for &reg in &saved {
            self.emit(Opcode::Push, vec![Operand::Reg(reg)]);
        }
        // Arguments go on last, in reverse, so the callee pops them in
        // declared order.
        for &reg in arg_regs.iter().rev() {
            self.emit(Opcode::Push, vec![Operand::Reg(reg)]);
        }
        self.emit(Opcode::Fncall, vec![Operand::Label(label)]);
        for &reg in saved.iter().rev() {
            self.emit(Opcode::Pop, vec![Operand::Reg(reg)]);
        }

        // Move the return value out of RV before anything else can
        // overwrite it (e.g. a second call in the same expression).
        let out = self.alloc_temp()?;
        self.emit(Opcode::Mov, vec![Operand::Reg(RV), Operand::Reg(out)]);
        Ok(out)
    }

    fn emit_input(&mut self, selector: Opcode, prompt: &Expr) -> Result<usize> {
        let prompt_reg = self.emit_expr(prompt)?;
        let dest = self.alloc_temp()?;
        self.emit(
            Opcode::Syscall,
            vec![
                Operand::Sys(selector),
                Operand::Reg(prompt_reg),
                Operand::Reg(dest),
            ],
        );
        Ok(dest)
    }

    fn emit(&mut self, opcode: Opcode, args: Vec<Operand>) {
        self.instructions.push(Instruction::new(opcode, args));
    }

    fn emit_label(&mut self, name: String) {
        self.emit(Opcode::Label, vec![Operand::Label(name)]);
    }

    fn fresh_label(&mut self) -> String {
        let label = format!("__L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    fn alloc_register(&mut self, name: &str) -> Result<usize> {
        if let Some(&reg) = self.registers.get(name) {
            return Ok(reg);
        }
        if self.next_register >= REGISTER_FILE_SIZE {
            return Err(CompileError::RegisterExhaustion);
        }
        let reg = self.next_register;
        self.next_register += 1;
        self.registers.insert(name.to_string(), reg);
        Ok(reg)
    }

    fn alloc_temp(&mut self) -> Result<usize> {
        let name = format!("__tmp{}", self.temp_counter);
        self.temp_counter += 1;
        self.alloc_register(&name)
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Emitter::new()
    }
}

fn function_label(name: &str) -> String {
    format!("__fn_{}", name)
}

fn comparison_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Eq => Opcode::JmpIf,
        BinOp::NotEq => Opcode::Jne,
        BinOp::Gt => Opcode::Jgt,
        BinOp::Ge => Opcode::Jge,
        BinOp::Lt => Opcode::Jlt,
        BinOp::Le => Opcode::Jle,
        _ => unreachable!("not a comparison operator: {}", op),
    }
}

fn arithmetic_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Mod => Opcode::Mod,
        BinOp::Shl => Opcode::Lshift,
        BinOp::Shr => Opcode::Rshift,
        // Logical and/or operate on the 0/1 boolean representation.
        BinOp::BitAnd | BinOp::And => Opcode::Band,
        BinOp::BitOr | BinOp::Or => Opcode::Bor,
        BinOp::BitXor => Opcode::Bxor,
        op => unreachable!("comparison operator in arithmetic lowering: {}", op),
    }
}
