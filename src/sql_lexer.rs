//! SQL lexer.
//!
//! Tokenizes the dialect's keywords (case-insensitive), identifiers,
//! integer and float literals, and operators. String literals are not part
//! of this core. Every token carries the character offset it started at so
//! parse errors can point into the input.

use crate::error::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Select,
    From,
    Where,
    As,
    Update,
    Set,
    And,
    Or,
    Not,
    Is,
    Null,

    // Literals
    Identifier(String),
    Integer(i64),
    Float(f64),

    // Operators
    Equal,         // =
    NotEqual,      // <>
    LessThan,      // <
    LessThanEq,    // <=
    GreaterThan,   // >
    GreaterThanEq, // >=
    Plus,          // +
    Minus,         // -
    Star,          // *
    Slash,         // /
    Comma,         // ,
    LeftParen,     // (
    RightParen,    // )

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(s) => write!(f, "identifier '{}'", s),
            Token::Integer(n) => write!(f, "integer {}", n),
            Token::Float(n) => write!(f, "float {}", n),
            Token::Eof => write!(f, "end of input"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A token plus the character offset it started at.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub offset: usize,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current = chars.first().copied();
        Lexer {
            input: chars,
            position: 0,
            current_char: current,
        }
    }

    /// Tokenize the entire input, ending with an `Eof` token.
    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<SpannedToken> {
        self.skip_whitespace();

        let offset = self.position;
        let token = match self.current_char {
            None => Token::Eof,
            Some(ch) => {
                if ch.is_ascii_alphabetic() || ch == '_' {
                    self.read_identifier()
                } else if ch.is_ascii_digit() {
                    self.read_number()?
                } else {
                    self.read_operator()?
                }
            }
        };

        Ok(SpannedToken { token, offset })
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> Token {
        let mut result = String::new();
        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match result.to_ascii_uppercase().as_str() {
            "SELECT" => Token::Select,
            "FROM" => Token::From,
            "WHERE" => Token::Where,
            "AS" => Token::As,
            "UPDATE" => Token::Update,
            "SET" => Token::Set,
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            "IS" => Token::Is,
            "NULL" => Token::Null,
            _ => Token::Identifier(result),
        }
    }

    fn read_number(&mut self) -> Result<Token> {
        let offset = self.position;
        let mut result = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                result.push(ch);
                self.advance();
            } else if ch == '.' && !is_float {
                // Only a digit after the dot makes this a float literal.
                match self.peek() {
                    Some(next) if next.is_ascii_digit() => {
                        is_float = true;
                        result.push(ch);
                        self.advance();
                    }
                    _ => break,
                }
            } else {
                break;
            }
        }

        if is_float {
            result.parse::<f64>().map(Token::Float).map_err(|e| Error::Parse {
                position: offset,
                message: format!("invalid float literal: {}", e),
            })
        } else {
            result.parse::<i64>().map(Token::Integer).map_err(|e| Error::Parse {
                position: offset,
                message: format!("invalid integer literal: {}", e),
            })
        }
    }

    fn read_operator(&mut self) -> Result<Token> {
        let offset = self.position;
        let ch = match self.current_char {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        let token = match (ch, self.peek()) {
            ('=', _) => {
                self.advance();
                Token::Equal
            }
            ('<', Some('>')) => {
                self.advance();
                self.advance();
                Token::NotEqual
            }
            ('<', Some('=')) => {
                self.advance();
                self.advance();
                Token::LessThanEq
            }
            ('<', _) => {
                self.advance();
                Token::LessThan
            }
            ('>', Some('=')) => {
                self.advance();
                self.advance();
                Token::GreaterThanEq
            }
            ('>', _) => {
                self.advance();
                Token::GreaterThan
            }
            ('+', _) => {
                self.advance();
                Token::Plus
            }
            ('-', _) => {
                self.advance();
                Token::Minus
            }
            ('*', _) => {
                self.advance();
                Token::Star
            }
            ('/', _) => {
                self.advance();
                Token::Slash
            }
            (',', _) => {
                self.advance();
                Token::Comma
            }
            ('(', _) => {
                self.advance();
                Token::LeftParen
            }
            (')', _) => {
                self.advance();
                Token::RightParen
            }
            _ => {
                return Err(Error::Parse {
                    position: offset,
                    message: format!("unexpected character '{}'", ch),
                })
            }
        };

        Ok(token)
    }
}
