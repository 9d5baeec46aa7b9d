// ayc-parser - Lexer for ayc
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexer (tokeniser) for ayc source code.
//!
//! Converts a source string into a stream of tokens. `//` comments run
//! to the end of the line.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::token::{Span, Token};

/// Lexer error with position information.
#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SyntaxError at {}:{}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// The lexer converts source code into tokens.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Tokenise the entire source, excluding the trailing EOF.
    pub fn tokenize(mut self) -> Result<Vec<(Token, Span)>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let (token, span) = self.next_token()?;
            if token == Token::Eof {
                return Ok(tokens);
            }
            tokens.push((token, span));
        }
    }

    /// Get the next token from the source.
    pub fn next_token(&mut self) -> Result<(Token, Span), LexError> {
        self.skip_whitespace_and_comments();

        let span = Span::new(self.line, self.column);
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok((Token::Eof, span)),
        };

        let token = match c {
            '0'..='9' => self.read_number(span)?,
            '"' => self.read_string(span)?,
            c if c.is_alphabetic() || c == '_' => self.read_ident(),
            _ => self.read_operator(span)?,
        };
        Ok((token, span))
    }

    fn read_number(&mut self, span: Span) -> Result<Token, LexError> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.advance();
        }
        digits
            .parse::<i64>()
            .map(Token::Int)
            .map_err(|_| self.error_at(span, format!("integer literal out of range: {}", digits)))
    }

    fn read_string(&mut self, span: Span) -> Result<Token, LexError> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    return Ok(Token::Str(text));
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
                None => {
                    return Err(self.error_at(span, "unterminated string literal".to_string()));
                }
            }
        }
    }

    fn read_ident(&mut self) -> Token {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if !c.is_alphanumeric() && c != '_' {
                break;
            }
            ident.push(c);
            self.advance();
        }
        Token::keyword(&ident).unwrap_or(Token::Ident(ident))
    }

    fn read_operator(&mut self, span: Span) -> Result<Token, LexError> {
        let c = self.peek().unwrap_or('\0');
        self.advance();

        // Two-character operators are paired by one character of lookahead.
        let token = match (c, self.peek()) {
            ('=', Some('=')) => self.advance_with(Token::EqEq),
            ('!', Some('=')) => self.advance_with(Token::NotEq),
            ('<', Some('=')) => self.advance_with(Token::Le),
            ('<', Some('<')) => self.advance_with(Token::Shl),
            ('>', Some('=')) => self.advance_with(Token::Ge),
            ('>', Some('>')) => self.advance_with(Token::Shr),
            ('&', Some('&')) => self.advance_with(Token::AmpAmp),
            ('|', Some('|')) => self.advance_with(Token::PipePipe),
            ('-', Some('>')) => self.advance_with(Token::Arrow),
            ('(', _) => Token::LParen,
            (')', _) => Token::RParen,
            ('{', _) => Token::LBrace,
            ('}', _) => Token::RBrace,
            (',', _) => Token::Comma,
            (';', _) => Token::Semicolon,
            (':', _) => Token::Colon,
            ('.', _) => Token::Period,
            ('+', _) => Token::Plus,
            ('-', _) => Token::Minus,
            ('*', _) => Token::Star,
            ('/', _) => Token::Slash,
            ('%', _) => Token::Percent,
            ('=', _) => Token::Eq,
            ('<', _) => Token::Lt,
            ('>', _) => Token::Gt,
            ('&', _) => Token::Amp,
            ('|', _) => Token::Pipe,
            ('^', _) => Token::Caret,
            ('~', _) => Token::Tilde,
            ('!', _) => Token::Bang,
            _ => {
                return Err(self.error_at(span, format!("unexpected character '{}'", c)));
            }
        };
        Ok(token)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') => {
                    // Only a comment if followed by a second slash.
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if lookahead.peek() == Some(&'/') {
                        while let Some(c) = self.peek() {
                            if c == '\n' {
                                break;
                            }
                            self.advance();
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        match c {
            Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            Some(_) => self.column += 1,
            None => {}
        }
        c
    }

    fn advance_with(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn error_at(&self, span: Span, message: String) -> LexError {
        LexError {
            message,
            line: span.line,
            column: span.column,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(s: &str) -> Vec<Token> {
        Lexer::new(s)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_integers() {
        assert_eq!(lex("42"), vec![Token::Int(42)]);
        assert_eq!(lex("0"), vec![Token::Int(0)]);
    }

    #[test]
    fn test_integer_overflow() {
        assert!(Lexer::new("99999999999999999999").tokenize().is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!(lex(r#""hello""#), vec![Token::Str("hello".to_string())]);
        assert_eq!(lex(r#""""#), vec![Token::Str(String::new())]);
    }

    #[test]
    fn test_unterminated_string() {
        assert!(Lexer::new("\"abc").tokenize().is_err());
    }

    #[test]
    fn test_keywords_and_idents() {
        assert_eq!(
            lex("let x input_str"),
            vec![Token::Let, Token::Ident("x".to_string()), Token::InputStr]
        );
        assert_eq!(lex("true false"), vec![Token::True, Token::False]);
        assert_eq!(lex("letx"), vec![Token::Ident("letx".to_string())]);
    }

    #[test]
    fn test_double_operators() {
        assert_eq!(
            lex("== != <= >= << >> && || ->"),
            vec![
                Token::EqEq,
                Token::NotEq,
                Token::Le,
                Token::Ge,
                Token::Shl,
                Token::Shr,
                Token::AmpAmp,
                Token::PipePipe,
                Token::Arrow,
            ]
        );
    }

    #[test]
    fn test_single_operators() {
        assert_eq!(
            lex("+ - * / % = < > & | ^ ~ !"),
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
                Token::Eq,
                Token::Lt,
                Token::Gt,
                Token::Amp,
                Token::Pipe,
                Token::Caret,
                Token::Tilde,
                Token::Bang,
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            lex("1 // the rest is ignored\n2"),
            vec![Token::Int(1), Token::Int(2)]
        );
        assert_eq!(lex("// only a comment"), vec![]);
        // A single slash is still division.
        assert_eq!(lex("4 / 2"), vec![Token::Int(4), Token::Slash, Token::Int(2)]);
    }

    #[test]
    fn test_spans() {
        let tokens = Lexer::new("let x\n  = 1").tokenize().unwrap();
        let spans: Vec<(usize, usize)> = tokens
            .iter()
            .map(|(_, s)| (s.line, s.column))
            .collect();
        assert_eq!(spans, vec![(1, 1), (1, 5), (2, 3), (2, 5)]);
    }

    #[test]
    fn test_unknown_character() {
        let err = Lexer::new("let @").tokenize().unwrap_err();
        assert!(err.message.contains("unexpected character"));
        assert_eq!(err.column, 5);
    }
}
