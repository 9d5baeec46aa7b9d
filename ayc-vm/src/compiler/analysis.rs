// ayc-vm - Bytecode compiler and virtual machine for the ayc programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Constant folding over the AST.
//!
//! The folder walks the statement list in source order, tracking the most
//! recent binding of each variable, and rewrites foldable sub-expressions
//! to literals. An `if` whose condition folds to a boolean is replaced by
//! the selected branch's statements. The walk is linear; control flow is
//! not modelled.

use std::collections::{HashMap, HashSet};

use ayc_parser::ast::{BinOp, Block, Expr, FuncDef, Program, Stmt, UnOp};

use super::{CompileError, Result};

/// A folded constant value.
#[derive(Debug, Clone, PartialEq)]
enum Const {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl Const {
    fn from_expr(expr: &Expr) -> Option<Const> {
        match expr {
            Expr::Int(n) => Some(Const::Int(*n)),
            Expr::Bool(b) => Some(Const::Bool(*b)),
            Expr::Str(s) => Some(Const::Str(s.clone())),
            _ => None,
        }
    }

    fn into_expr(self) -> Expr {
        match self {
            Const::Int(n) => Expr::Int(n),
            Const::Bool(b) => Expr::Bool(b),
            Const::Str(s) => Expr::Str(s),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Const::Int(_) => "integer",
            Const::Bool(_) => "boolean",
            Const::Str(_) => "string",
        }
    }

    /// Booleans are 0/1 integers at the VM layer; comparisons use that
    /// numeric view.
    fn as_ordering_int(&self) -> Option<i64> {
        match self {
            Const::Int(n) => Some(*n),
            Const::Bool(b) => Some(*b as i64),
            Const::Str(_) => None,
        }
    }
}

/// The most recent binding of a variable during the walk.
#[derive(Debug, Clone)]
enum Binding {
    /// Bound to a literal; substituted into folds.
    Const(Const),
    /// Declared, but not a compile-time constant (parameters, input
    /// results, expressions over dynamic values).
    Dynamic,
}

/// The constant folder.
#[derive(Default)]
pub struct Folder {
    env: HashMap<String, Binding>,
    functions: HashSet<String>,
}

impl Folder {
    pub fn new() -> Self {
        Folder::default()
    }

    /// Fold a program, producing a semantically equivalent one.
    pub fn fold_program(mut self, program: Program) -> Result<Program> {
        // Register every function up front so forward calls resolve, the
        // same pre-pass the emitter performs.
        for stmt in &program.statements {
            if let Stmt::FuncDef(def) = stmt {
                self.functions.insert(def.name.clone());
            }
        }
        let statements = self.fold_statements(program.statements)?;
        Ok(Program { statements })
    }

    fn fold_statements(&mut self, statements: Vec<Stmt>) -> Result<Vec<Stmt>> {
        let mut out = Vec::with_capacity(statements.len());
        for stmt in statements {
            self.fold_stmt(stmt, &mut out)?;
        }
        Ok(out)
    }

    fn fold_stmt(&mut self, stmt: Stmt, out: &mut Vec<Stmt>) -> Result<()> {
        match stmt {
            Stmt::Let { name, value } => {
                let value = self.fold_expr(value)?;
                self.bind(&name, &value);
                out.push(Stmt::Let { name, value });
            }
            Stmt::Assign { name, value } => {
                if !self.env.contains_key(&name) {
                    return Err(CompileError::UndeclaredVariable(name));
                }
                let value = self.fold_expr(value)?;
                self.bind(&name, &value);
                out.push(Stmt::Assign { name, value });
            }
            Stmt::Print(value) => out.push(Stmt::Print(self.fold_expr(value)?)),
            Stmt::Return(value) => out.push(Stmt::Return(self.fold_expr(value)?)),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                let cond = self.fold_expr(cond)?;
                match cond {
                    // A constant condition selects its branch's statements.
                    Expr::Bool(true) => {
                        out.extend(self.fold_statements(then_block.statements)?);
                    }
                    Expr::Bool(false) => {
                        if let Some(else_block) = else_block {
                            out.extend(self.fold_statements(else_block.statements)?);
                        }
                    }
                    cond => {
                        let then_block = self.fold_block(then_block)?;
                        let else_block = match else_block {
                            Some(block) => Some(self.fold_block(block)?),
                            None => None,
                        };
                        out.push(Stmt::If {
                            cond,
                            then_block,
                            else_block,
                        });
                    }
                }
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                // Loop statements re-execute, so the linear walk cannot
                // fold anything inside them; every variable they touch
                // stops being constant.
                self.declare_dynamic(&init);
                self.declare_dynamic(&step);
                for stmt in &body.statements {
                    self.declare_dynamic(stmt);
                }
                out.push(Stmt::For {
                    init,
                    cond,
                    step,
                    body,
                });
            }
            Stmt::FuncDef(def) => {
                let FuncDef {
                    name,
                    params,
                    body,
                    ret_type,
                } = def;
                // Parameters are declared but carry no constant value.
                for param in &params {
                    self.env.insert(param.name.clone(), Binding::Dynamic);
                }
                let body = self.fold_block(body)?;
                out.push(Stmt::FuncDef(FuncDef {
                    name,
                    params,
                    body,
                    ret_type,
                }));
            }
            Stmt::Expr(expr) => out.push(Stmt::Expr(self.fold_expr(expr)?)),
        }
        Ok(())
    }

    fn fold_block(&mut self, block: Block) -> Result<Block> {
        Ok(Block {
            statements: self.fold_statements(block.statements)?,
        })
    }

    /// Mark every variable a statement binds or assigns as dynamic.
    fn declare_dynamic(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let { name, .. } | Stmt::Assign { name, .. } => {
                self.env.insert(name.clone(), Binding::Dynamic);
            }
            Stmt::If {
                then_block,
                else_block,
                ..
            } => {
                for stmt in &then_block.statements {
                    self.declare_dynamic(stmt);
                }
                if let Some(block) = else_block {
                    for stmt in &block.statements {
                        self.declare_dynamic(stmt);
                    }
                }
            }
            Stmt::For {
                init, step, body, ..
            } => {
                self.declare_dynamic(init);
                self.declare_dynamic(step);
                for stmt in &body.statements {
                    self.declare_dynamic(stmt);
                }
            }
            _ => {}
        }
    }

    fn bind(&mut self, name: &str, value: &Expr) {
        let binding = match Const::from_expr(value) {
            Some(c) => Binding::Const(c),
            None => Binding::Dynamic,
        };
        self.env.insert(name.to_string(), binding);
    }

    fn fold_expr(&mut self, expr: Expr) -> Result<Expr> {
        match expr {
            Expr::Int(_) | Expr::Bool(_) | Expr::Str(_) | Expr::Ident(_) => Ok(expr),
            Expr::Unary { op, operand } => {
                let operand = self.fold_expr(*operand)?;
                if let Some(c) = self.operand_const(&operand)? {
                    return eval_unary(op, c).map(Const::into_expr);
                }
                Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.fold_expr(*lhs)?;
                let rhs = self.fold_expr(*rhs)?;
                if let (Some(l), Some(r)) =
                    (self.operand_const(&lhs)?, self.operand_const(&rhs)?)
                {
                    return eval_binary(op, l, r).map(Const::into_expr);
                }
                Ok(Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })
            }
            Expr::Call {
                callee,
                args,
                is_recursive,
                is_tail,
            } => {
                if !self.functions.contains(&callee) {
                    return Err(CompileError::UndeclaredFunction(callee));
                }
                let args = args
                    .into_iter()
                    .map(|arg| self.fold_expr(arg))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::Call {
                    callee,
                    args,
                    is_recursive,
                    is_tail,
                })
            }
            Expr::InputInt { prompt } => Ok(Expr::InputInt {
                prompt: Box::new(self.fold_expr(*prompt)?),
            }),
            Expr::InputStr { prompt } => Ok(Expr::InputStr {
                prompt: Box::new(self.fold_expr(*prompt)?),
            }),
        }
    }

    /// The constant view of a fold operand. Identifiers substitute their
    /// binding when it is a literal; an undeclared identifier here is
    /// fatal.
    fn operand_const(&self, expr: &Expr) -> Result<Option<Const>> {
        if let Expr::Ident(name) = expr {
            return match self.env.get(name) {
                Some(Binding::Const(c)) => Ok(Some(c.clone())),
                Some(Binding::Dynamic) => Ok(None),
                None => Err(CompileError::UndeclaredVariable(name.clone())),
            };
        }
        Ok(Const::from_expr(expr))
    }
}

fn eval_unary(op: UnOp, operand: Const) -> Result<Const> {
    match (op, &operand) {
        (UnOp::Neg, Const::Int(n)) => Ok(Const::Int(n.wrapping_neg())),
        (UnOp::BitNot, Const::Int(n)) => Ok(Const::Int(!n)),
        (UnOp::Not, Const::Bool(b)) => Ok(Const::Bool(!b)),
        (UnOp::Not, Const::Int(n)) => Ok(Const::Bool(*n == 0)),
        _ => Err(CompileError::TypeMismatch {
            op: op.to_string(),
            operand: operand.type_name().to_string(),
        }),
    }
}

fn eval_binary(op: BinOp, lhs: Const, rhs: Const) -> Result<Const> {
    match (&lhs, &rhs) {
        (Const::Int(l), Const::Int(r)) => eval_int_binary(op, *l, *r),
        (Const::Str(l), Const::Str(r)) => eval_str_binary(op, l, r),
        (Const::Bool(l), Const::Bool(r)) => match op {
            BinOp::Eq => Ok(Const::Bool(l == r)),
            BinOp::NotEq => Ok(Const::Bool(l != r)),
            BinOp::And => Ok(Const::Bool(*l && *r)),
            BinOp::Or => Ok(Const::Bool(*l || *r)),
            // Ordering comparisons see the 0/1 representation.
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let (l, r) = (lhs.as_ordering_int().unwrap(), rhs.as_ordering_int().unwrap());
                eval_int_binary(op, l, r)
            }
            _ => Err(CompileError::TypeMismatch {
                op: op.to_string(),
                operand: "boolean".to_string(),
            }),
        },
        _ => Err(CompileError::TypeMismatch {
            op: op.to_string(),
            operand: format!("{} and {}", lhs.type_name(), rhs.type_name()),
        }),
    }
}

fn eval_int_binary(op: BinOp, l: i64, r: i64) -> Result<Const> {
    let result = match op {
        BinOp::Add => Const::Int(l.wrapping_add(r)),
        BinOp::Sub => Const::Int(l.wrapping_sub(r)),
        BinOp::Mul => Const::Int(l.wrapping_mul(r)),
        BinOp::Div => {
            if r == 0 {
                return Err(CompileError::DivisionByZero);
            }
            Const::Int(l.wrapping_div(r))
        }
        BinOp::Mod => {
            if r == 0 {
                return Err(CompileError::DivisionByZero);
            }
            Const::Int(l.wrapping_rem(r))
        }
        BinOp::Shl => Const::Int(l.wrapping_shl(r as u32)),
        BinOp::Shr => Const::Int(l.wrapping_shr(r as u32)),
        BinOp::BitAnd | BinOp::And => Const::Int(l & r),
        BinOp::BitOr | BinOp::Or => Const::Int(l | r),
        BinOp::BitXor => Const::Int(l ^ r),
        BinOp::Eq => Const::Bool(l == r),
        BinOp::NotEq => Const::Bool(l != r),
        BinOp::Lt => Const::Bool(l < r),
        BinOp::Le => Const::Bool(l <= r),
        BinOp::Gt => Const::Bool(l > r),
        BinOp::Ge => Const::Bool(l >= r),
    };
    Ok(result)
}

/// String `+` concatenates; comparisons are lexicographic over UTF-8
/// code units; everything else is a type error.
fn eval_str_binary(op: BinOp, l: &str, r: &str) -> Result<Const> {
    let result = match op {
        BinOp::Add => Const::Str(format!("{}{}", l, r)),
        BinOp::Eq => Const::Bool(l == r),
        BinOp::NotEq => Const::Bool(l != r),
        BinOp::Lt => Const::Bool(l < r),
        BinOp::Le => Const::Bool(l <= r),
        BinOp::Gt => Const::Bool(l > r),
        BinOp::Ge => Const::Bool(l >= r),
        _ => {
            return Err(CompileError::TypeMismatch {
                op: op.to_string(),
                operand: "string".to_string(),
            });
        }
    };
    Ok(result)
}
