// ayc-vm - Bytecode compiler and virtual machine for the ayc programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Register-oriented virtual machine for executing ayc bytecode.

pub mod stack;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::rc::Rc;

use tracing::debug;

use crate::opcode::Opcode;
use crate::program::{Instruction, Operand, Program, Value, REGISTER_FILE_SIZE, RV};

pub use stack::ValueStack;

/// Runtime error during VM execution.
#[derive(Debug, Clone)]
pub enum RuntimeError {
    /// Data stack underflow.
    StackUnderflow,
    /// RET with no pending call.
    CallStackUnderflow,
    /// Type error.
    TypeError { expected: String, got: String },
    /// Division or modulus by zero.
    DivisionByZero,
    /// Jump or call target with no matching label.
    UndefinedLabel(String),
    /// Symbol-store lookup of a name never stored.
    UndefinedSymbol(String),
    /// Register index outside the register file.
    RegisterOutOfRange(usize),
    /// Operand shape does not match the opcode.
    MalformedInstruction(String),
    /// An input token could not be read or parsed.
    InvalidInput(String),
    /// Underlying I/O failure.
    Io(String),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::StackUnderflow => write!(f, "RuntimeError: data stack underflow"),
            RuntimeError::CallStackUnderflow => {
                write!(f, "RuntimeError: return with no pending call")
            }
            RuntimeError::TypeError { expected, got } => {
                write!(f, "TypeError: expected {}, got {}", expected, got)
            }
            RuntimeError::DivisionByZero => {
                write!(f, "ArithmeticError: division or modulus by zero")
            }
            RuntimeError::UndefinedLabel(name) => {
                write!(f, "RuntimeError: unknown label {}", name)
            }
            RuntimeError::UndefinedSymbol(name) => {
                write!(f, "NameError: unknown symbol {}", name)
            }
            RuntimeError::RegisterOutOfRange(reg) => {
                write!(f, "RuntimeError: register r{} out of range", reg)
            }
            RuntimeError::MalformedInstruction(msg) => write!(f, "RuntimeError: {}", msg),
            RuntimeError::InvalidInput(msg) => write!(f, "RuntimeError: invalid input: {}", msg),
            RuntimeError::Io(msg) => write!(f, "IOError: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// The ayc virtual machine.
pub struct Vm<'a> {
    /// The program being executed. Shared so the dispatch loop can hold
    /// instructions while mutating machine state.
    program: Rc<Program>,

    /// Program counter.
    pc: usize,

    /// Register file. Register 0 is the return-value register.
    registers: Vec<Value>,

    /// Data stack (arguments and caller-saved registers).
    data: ValueStack,

    /// Call stack of return addresses.
    calls: Vec<usize>,

    /// Symbol store, written by STORE and read by LOAD and name operands.
    symbols: HashMap<String, Value>,

    /// Label table, populated by a load-time scan.
    labels: HashMap<String, usize>,

    input: Box<dyn BufRead + 'a>,
    output: Box<dyn Write + 'a>,
}

impl Vm<'static> {
    /// Create a VM reading standard input and writing standard output.
    pub fn new(program: Program) -> Self {
        Vm::with_io(program, BufReader::new(io::stdin()), io::stdout())
    }
}

impl<'a> Vm<'a> {
    /// Create a VM with explicit input and output streams.
    pub fn with_io(
        program: Program,
        input: impl BufRead + 'a,
        output: impl Write + 'a,
    ) -> Self {
        // Labels may be used before they are defined; resolve them all
        // up front.
        let mut labels = HashMap::new();
        for (offset, instruction) in program.instructions.iter().enumerate() {
            if instruction.opcode == Opcode::Label {
                if let Some(Operand::Label(name)) = instruction.args.first() {
                    labels.insert(name.clone(), offset);
                }
            }
        }
        Vm {
            program: Rc::new(program),
            pc: 0,
            registers: vec![Value::Int(0); REGISTER_FILE_SIZE],
            data: ValueStack::new(),
            calls: Vec::new(),
            symbols: HashMap::new(),
            labels,
            input: Box::new(input),
            output: Box::new(output),
        }
    }

    /// Run the program to completion or HALT.
    pub fn run(&mut self) -> Result<()> {
        let program = Rc::clone(&self.program);
        while self.pc < program.instructions.len() {
            let instruction = &program.instructions[self.pc];
            match instruction.opcode {
                Opcode::Mov => {
                    let value = self.read_value(arg(instruction, 0)?)?;
                    let dest = self.reg_index(arg(instruction, 1)?)?;
                    self.registers[dest] = value;
                }
                Opcode::Load => {
                    let value = self.read_value(arg(instruction, 0)?)?;
                    let dest = self.reg_index(arg(instruction, 1)?)?;
                    self.registers[dest] = value;
                }
                Opcode::Store => {
                    let src = self.reg_index(arg(instruction, 0)?)?;
                    let name = label_name(arg(instruction, 1)?)?;
                    self.symbols
                        .insert(name.to_string(), self.registers[src].clone());
                }

                Opcode::Add => {
                    let a = self.read_value(arg(instruction, 0)?)?;
                    let b = self.read_value(arg(instruction, 1)?)?;
                    let dest = self.reg_index(arg(instruction, 2)?)?;
                    self.registers[dest] = match (a, b) {
                        (Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_add(y)),
                        (Value::Str(x), Value::Str(y)) => Value::Str(format!("{}{}", x, y)),
                        (a, b) => {
                            return Err(RuntimeError::TypeError {
                                expected: a.type_name().to_string(),
                                got: b.type_name().to_string(),
                            });
                        }
                    };
                }
                Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::Band
                | Opcode::Bor
                | Opcode::Bxor
                | Opcode::Lshift
                | Opcode::Rshift => {
                    let a = self.read_int(arg(instruction, 0)?)?;
                    let b = self.read_int(arg(instruction, 1)?)?;
                    let dest = self.reg_index(arg(instruction, 2)?)?;
                    self.registers[dest] = Value::Int(int_binary(instruction.opcode, a, b)?);
                }
                Opcode::Bnot => {
                    let a = self.read_int(arg(instruction, 0)?)?;
                    let dest = self.reg_index(arg(instruction, 1)?)?;
                    self.registers[dest] = Value::Int(!a);
                }
                Opcode::Not => {
                    let a = self.read_int(arg(instruction, 0)?)?;
                    let dest = self.reg_index(arg(instruction, 1)?)?;
                    self.registers[dest] = Value::Int(if a == 0 { 1 } else { 0 });
                }

                Opcode::Jmp => {
                    self.pc = self.label_offset(label_name(arg(instruction, 0)?)?)?;
                    continue;
                }
                Opcode::Jnt => {
                    let value = self.read_int(arg(instruction, 0)?)?;
                    if value == 0 {
                        self.pc = self.label_offset(label_name(arg(instruction, 1)?)?)?;
                        continue;
                    }
                }
                Opcode::JmpIf
                | Opcode::Jne
                | Opcode::Jgt
                | Opcode::Jge
                | Opcode::Jlt
                | Opcode::Jle => {
                    let a = self.read_value(arg(instruction, 0)?)?;
                    let b = self.read_value(arg(instruction, 1)?)?;
                    let ord = compare(&a, &b)?;
                    let taken = match instruction.opcode {
                        Opcode::JmpIf => ord == Ordering::Equal,
                        Opcode::Jne => ord != Ordering::Equal,
                        Opcode::Jgt => ord == Ordering::Greater,
                        Opcode::Jge => ord != Ordering::Less,
                        Opcode::Jlt => ord == Ordering::Less,
                        Opcode::Jle => ord != Ordering::Greater,
                        _ => unreachable!(),
                    };
                    if taken {
                        self.pc = self.label_offset(label_name(arg(instruction, 2)?)?)?;
                        continue;
                    }
                }
                // Labels are resolved at load time; executing one just
                // advances the program counter.
                Opcode::Label => {}

                Opcode::Push => {
                    let value = self.read_value(arg(instruction, 0)?)?;
                    self.data.push(value);
                }
                Opcode::Pop => {
                    let dest = self.reg_index(arg(instruction, 0)?)?;
                    self.registers[dest] = self.data.pop()?;
                }
                Opcode::Fncall => {
                    let name = label_name(arg(instruction, 0)?)?;
                    let target = self.label_offset(name)?;
                    debug!(label = name, pc = self.pc, "function call");
                    self.calls.push(self.pc + 1);
                    self.pc = target;
                    continue;
                }
                Opcode::Ret => {
                    self.pc = self.calls.pop().ok_or(RuntimeError::CallStackUnderflow)?;
                    debug!(pc = self.pc, rv = %self.registers[RV], "return");
                    continue;
                }

                Opcode::Syscall => self.syscall(instruction)?,
                Opcode::Halt => return Ok(()),
                Opcode::Nop => {}

                Opcode::Print | Opcode::Input | Opcode::InputStr => {
                    return Err(RuntimeError::MalformedInstruction(format!(
                        "{} is only valid as a SYSCALL selector",
                        instruction.opcode
                    )));
                }
            }
            self.pc += 1;
        }
        Ok(())
    }

    fn syscall(&mut self, instruction: &Instruction) -> Result<()> {
        let selector = match arg(instruction, 0)? {
            Operand::Sys(op) => *op,
            other => {
                return Err(RuntimeError::MalformedInstruction(format!(
                    "SYSCALL requires a selector, got {}",
                    other
                )));
            }
        };
        match selector {
            Opcode::Print => {
                let value = self.read_value(arg(instruction, 1)?)?;
                writeln!(self.output, "PRINT: {}", value)
                    .map_err(|e| RuntimeError::Io(e.to_string()))?;
            }
            Opcode::Input => {
                let prompt = self.read_value(arg(instruction, 1)?)?;
                let dest = self.reg_index(arg(instruction, 2)?)?;
                write!(self.output, "{}: ", prompt)
                    .and_then(|_| self.output.flush())
                    .map_err(|e| RuntimeError::Io(e.to_string()))?;
                let token = self.read_token()?;
                let n = token
                    .parse::<i64>()
                    .map_err(|_| RuntimeError::InvalidInput(format!("expected integer, got {:?}", token)))?;
                self.registers[dest] = Value::Int(n);
            }
            Opcode::InputStr => {
                let prompt = self.read_value(arg(instruction, 1)?)?;
                let dest = self.reg_index(arg(instruction, 2)?)?;
                write!(self.output, "{}: ", prompt)
                    .and_then(|_| self.output.flush())
                    .map_err(|e| RuntimeError::Io(e.to_string()))?;
                let token = self.read_token()?;
                self.registers[dest] = Value::Str(token);
            }
            other => {
                return Err(RuntimeError::MalformedInstruction(format!(
                    "unknown syscall {}",
                    other
                )));
            }
        }
        Ok(())
    }

    /// Read one whitespace-delimited token from the input stream.
    fn read_token(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        let mut buf = [0u8; 1];
        // Skip leading whitespace.
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => {
                    return Err(RuntimeError::InvalidInput(
                        "unexpected end of input".to_string(),
                    ));
                }
                Ok(_) if buf[0].is_ascii_whitespace() => continue,
                Ok(_) => {
                    bytes.push(buf[0]);
                    break;
                }
                Err(e) => return Err(RuntimeError::Io(e.to_string())),
            }
        }
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => break,
                Ok(_) if buf[0].is_ascii_whitespace() => break,
                Ok(_) => bytes.push(buf[0]),
                Err(e) => return Err(RuntimeError::Io(e.to_string())),
            }
        }
        String::from_utf8(bytes)
            .map_err(|_| RuntimeError::InvalidInput("input is not valid UTF-8".to_string()))
    }

    /// Resolve an operand in a value position: a register index reads
    /// the register file, a literal yields its value, a name reads the
    /// symbol store.
    fn read_value(&self, operand: &Operand) -> Result<Value> {
        match operand {
            Operand::Reg(reg) => {
                if *reg >= self.registers.len() {
                    return Err(RuntimeError::RegisterOutOfRange(*reg));
                }
                Ok(self.registers[*reg].clone())
            }
            Operand::Lit(value) => Ok(value.clone()),
            Operand::Label(name) => self
                .symbols
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::UndefinedSymbol(name.clone())),
            Operand::Sys(op) => Err(RuntimeError::MalformedInstruction(format!(
                "syscall selector {} in value position",
                op
            ))),
        }
    }

    fn read_int(&self, operand: &Operand) -> Result<i64> {
        match self.read_value(operand)? {
            Value::Int(n) => Ok(n),
            Value::Str(_) => Err(RuntimeError::TypeError {
                expected: "integer".to_string(),
                got: "string".to_string(),
            }),
        }
    }

    fn reg_index(&self, operand: &Operand) -> Result<usize> {
        match operand {
            Operand::Reg(reg) if *reg < self.registers.len() => Ok(*reg),
            Operand::Reg(reg) => Err(RuntimeError::RegisterOutOfRange(*reg)),
            other => Err(RuntimeError::MalformedInstruction(format!(
                "expected register operand, got {}",
                other
            ))),
        }
    }

    fn label_offset(&self, name: &str) -> Result<usize> {
        self.labels
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::UndefinedLabel(name.to_string()))
    }
}

fn arg<'i>(instruction: &'i Instruction, index: usize) -> Result<&'i Operand> {
    instruction.args.get(index).ok_or_else(|| {
        RuntimeError::MalformedInstruction(format!(
            "{} is missing operand {}",
            instruction.opcode, index
        ))
    })
}

fn label_name(operand: &Operand) -> Result<&str> {
    match operand {
        Operand::Label(name) => Ok(name),
        other => Err(RuntimeError::MalformedInstruction(format!(
            "expected label operand, got {}",
            other
        ))),
    }
}

/// Compare two values: integers as signed integers, strings
/// lexicographically over UTF-8 code units. Mixed kinds are an error.
fn compare(a: &Value, b: &Value) -> Result<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        _ => Err(RuntimeError::TypeError {
            expected: a.type_name().to_string(),
            got: b.type_name().to_string(),
        }),
    }
}

fn int_binary(opcode: Opcode, a: i64, b: i64) -> Result<i64> {
    let result = match opcode {
        Opcode::Sub => a.wrapping_sub(b),
        Opcode::Mul => a.wrapping_mul(b),
        Opcode::Div => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
        Opcode::Mod => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a.wrapping_rem(b)
        }
        Opcode::Band => a & b,
        Opcode::Bor => a | b,
        Opcode::Bxor => a ^ b,
        Opcode::Lshift => a.wrapping_shl(b as u32),
        Opcode::Rshift => a.wrapping_shr(b as u32),
        op => unreachable!("not an integer binary opcode: {}", op),
    };
    Ok(result)
}
