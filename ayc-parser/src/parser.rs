// ayc-parser - Parser for ayc
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Recursive-descent parser for ayc.
//!
//! Statements are dispatched on their leading token; expressions are
//! parsed with a binding-power loop. Precedence, low to high:
//! `and`/`or` (3), comparisons (5), `|` (6), `^` (7), `&` (8),
//! shifts (9), `+`/`-` (10), `*`/`/`/`%` (20), unary operators tighter.

use std::fmt;

use tracing::debug;

use crate::ast::{BinOp, Block, Expr, FuncDef, Param, Program, Stmt, Type, UnOp};
use crate::lexer::{LexError, Lexer};
use crate::token::{Span, Token};

/// Binding power of unary operators.
const UNARY_BP: u8 = 25;

/// Parse error with position information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    /// Render the error with the offending source line and a caret.
    pub fn render(&self, source: &str) -> String {
        let line_text = source.lines().nth(self.line.saturating_sub(1)).unwrap_or("");
        format!(
            "{}\n{}\n{}^",
            self,
            line_text,
            " ".repeat(self.column.saturating_sub(1))
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SyntaxError at {}:{}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            line: err.line,
            column: err.column,
        }
    }
}

/// Result type for parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// The ayc parser.
pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    /// Name of the function definition being parsed, for recursion flags.
    current_func: Option<String>,
}

impl Parser {
    /// Create a parser over the given source, tokenising it up front.
    pub fn new(source: &str) -> Result<Self> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Parser {
            tokens,
            pos: 0,
            current_func: None,
        })
    }

    /// Parse a whole program.
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut statements = Vec::new();
        while *self.current() != Token::Eof {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        debug!(token = %self.current(), "parsing statement");
        match self.current() {
            Token::Let => self.parse_let(),
            Token::Print => {
                self.advance();
                Ok(Stmt::Print(self.parse_expr(0)?))
            }
            Token::Return => self.parse_return(),
            Token::If => self.parse_if(),
            Token::For => self.parse_for(),
            Token::Def => self.parse_func_def(),
            Token::Ident(_) => self.parse_ident_statement(),
            other => Err(self.error(format!("unexpected token {}", other))),
        }
    }

    fn parse_let(&mut self) -> Result<Stmt> {
        self.advance(); // let
        let name = self.expect_ident()?;
        self.expect(Token::Eq)?;
        let value = self.parse_expr(0)?;
        Ok(Stmt::Let { name, value })
    }

    /// An identifier in statement position starts an assignment or a
    /// bare expression statement (typically a call).
    fn parse_ident_statement(&mut self) -> Result<Stmt> {
        if *self.peek() == Token::Eq {
            let name = self.expect_ident()?;
            self.advance(); // =
            let value = self.parse_expr(0)?;
            return Ok(Stmt::Assign { name, value });
        }
        Ok(Stmt::Expr(self.parse_expr(0)?))
    }

    fn parse_return(&mut self) -> Result<Stmt> {
        self.advance(); // return
        let mut value = self.parse_expr(0)?;
        // A call that is the entire return value is a tail call.
        if let Expr::Call { is_tail, .. } = &mut value {
            *is_tail = true;
        }
        Ok(Stmt::Return(value))
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        self.advance(); // if
        let cond = self.parse_expr(0)?;
        let then_block = self.parse_block()?;
        let else_block = if *self.current() == Token::Else {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_block,
            else_block,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        self.advance(); // for
        self.expect(Token::LParen)?;
        let init = self.parse_simple_statement()?;
        self.expect(Token::Semicolon)?;
        let cond = self.parse_expr(0)?;
        self.expect(Token::Semicolon)?;
        let step = self.parse_simple_statement()?;
        self.expect(Token::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            init: Box::new(init),
            cond,
            step: Box::new(step),
            body,
        })
    }

    /// The restricted statement forms allowed in a `for` header.
    fn parse_simple_statement(&mut self) -> Result<Stmt> {
        match self.current() {
            Token::Let => self.parse_let(),
            Token::Ident(_) => self.parse_ident_statement(),
            other => Err(self.error(format!(
                "expected declaration or assignment, got {}",
                other
            ))),
        }
    }

    fn parse_func_def(&mut self) -> Result<Stmt> {
        self.advance(); // def
        let name = self.expect_ident()?;
        debug!(name = %name, "parsing function definition");
        self.expect(Token::LParen)?;

        let mut params = Vec::new();
        while *self.current() != Token::RParen {
            let param_name = self.expect_ident()?;
            let ty = if *self.current() == Token::Colon {
                self.advance();
                self.expect_type()?
            } else {
                Type::Void
            };
            params.push(Param {
                name: param_name,
                ty,
            });
            if *self.current() == Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(Token::RParen)?;
        self.expect(Token::Arrow)?;
        let ret_type = self.expect_type()?;

        let previous_func = self.current_func.replace(name.clone());
        let body = self.parse_block()?;
        self.current_func = previous_func;

        Ok(Stmt::FuncDef(FuncDef {
            name,
            params,
            body,
            ret_type,
        }))
    }

    fn parse_block(&mut self) -> Result<Block> {
        self.expect(Token::LBrace)?;
        let mut statements = Vec::new();
        while *self.current() != Token::RBrace {
            if *self.current() == Token::Eof {
                return Err(self.error("unexpected EOF, expected }".to_string()));
            }
            // Functions are top-level and flat.
            if *self.current() == Token::Def {
                return Err(
                    self.error("function definitions are only allowed at top level".to_string())
                );
            }
            statements.push(self.parse_statement()?);
        }
        self.advance(); // }
        Ok(Block { statements })
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr> {
        let mut left = self.parse_primary()?;

        while let Some((op, bp)) = binary_op(self.current()) {
            if bp <= min_bp {
                break;
            }
            self.advance();
            let right = self.parse_expr(bp)?;
            left = Expr::Binary {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.current().clone() {
            Token::Int(n) => {
                self.advance();
                Ok(Expr::Int(n))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            Token::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            Token::Ident(name) => {
                self.advance();
                if *self.current() == Token::LParen {
                    return self.parse_call(name);
                }
                Ok(Expr::Ident(name))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr(0)?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Minus => self.parse_unary(UnOp::Neg),
            Token::Bang | Token::Not => self.parse_unary(UnOp::Not),
            Token::Tilde => self.parse_unary(UnOp::BitNot),
            Token::Input => self.parse_input(false),
            Token::InputStr => self.parse_input(true),
            other => Err(self.error(format!("unexpected token {} in expression", other))),
        }
    }

    fn parse_unary(&mut self, op: UnOp) -> Result<Expr> {
        self.advance();
        let operand = self.parse_expr(UNARY_BP)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_call(&mut self, callee: String) -> Result<Expr> {
        self.advance(); // (
        let mut args = Vec::new();
        while *self.current() != Token::RParen {
            args.push(self.parse_expr(0)?);
            if *self.current() == Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(Token::RParen)?;
        let is_recursive = self.current_func.as_deref() == Some(callee.as_str());
        Ok(Expr::Call {
            callee,
            args,
            is_recursive,
            is_tail: false,
        })
    }

    fn parse_input(&mut self, is_str: bool) -> Result<Expr> {
        self.advance(); // input / input_str
        self.expect(Token::LParen)?;
        let prompt = Box::new(self.parse_expr(0)?);
        self.expect(Token::RParen)?;
        if is_str {
            Ok(Expr::InputStr { prompt })
        } else {
            Ok(Expr::InputInt { prompt })
        }
    }

    fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|(t, _)| t)
            .unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos + 1)
            .map(|(t, _)| t)
            .unwrap_or(&Token::Eof)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| *s)
            .unwrap_or_else(|| {
                self.tokens
                    .last()
                    .map(|(_, s)| *s)
                    .unwrap_or_default()
            })
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if *self.current() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {}, got {}", expected, self.current())))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected identifier, got {}", other))),
        }
    }

    fn expect_type(&mut self) -> Result<Type> {
        let ty = match self.current() {
            Token::IntType => Type::Int,
            Token::StrType => Type::Str,
            Token::BoolType => Type::Bool,
            Token::VoidType => Type::Void,
            other => return Err(self.error(format!("expected type, got {}", other))),
        };
        self.advance();
        Ok(ty)
    }

    fn error(&self, message: String) -> ParseError {
        let span = self.span();
        ParseError {
            message,
            line: span.line,
            column: span.column,
        }
    }
}

/// Map a token to its binary operator and binding power.
fn binary_op(token: &Token) -> Option<(BinOp, u8)> {
    let pair = match token {
        Token::Or | Token::PipePipe => (BinOp::Or, 3),
        Token::And | Token::AmpAmp => (BinOp::And, 3),
        Token::EqEq => (BinOp::Eq, 5),
        Token::NotEq => (BinOp::NotEq, 5),
        Token::Lt => (BinOp::Lt, 5),
        Token::Le => (BinOp::Le, 5),
        Token::Gt => (BinOp::Gt, 5),
        Token::Ge => (BinOp::Ge, 5),
        Token::Pipe => (BinOp::BitOr, 6),
        Token::Caret => (BinOp::BitXor, 7),
        Token::Amp => (BinOp::BitAnd, 8),
        Token::Shl => (BinOp::Shl, 9),
        Token::Shr => (BinOp::Shr, 9),
        Token::Plus => (BinOp::Add, 10),
        Token::Minus => (BinOp::Sub, 10),
        Token::Star => (BinOp::Mul, 20),
        Token::Slash => (BinOp::Div, 20),
        Token::Percent => (BinOp::Mod, 20),
        _ => return None,
    };
    Some(pair)
}

// ============================================================================
// Tests
// ============================================================================
