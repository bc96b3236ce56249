//! SQL parser.
//!
//! Recursive descent over the lexer's token stream. Condition precedence
//! is standard SQL: `NOT` binds tightest, then `AND`, then `OR`, all
//! left-associative. Comparisons admit the full set
//! `= <> < <= > >=` plus `IS [NOT] NULL`.

use crate::error::{Error, Result};
use crate::sql_ast::*;
use crate::sql_lexer::{Lexer, SpannedToken, Token};

pub struct Parser {
    tokens: Vec<SpannedToken>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        Parser {
            tokens,
            position: 0,
        }
    }

    /// Parse one statement from a SQL string.
    pub fn parse(input: &str) -> Result<Statement> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Parser::new(tokens);
        let statement = parser.parse_statement()?;
        parser.expect_eof()?;
        Ok(statement)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Select => Ok(Statement::Select(self.parse_select()?)),
            Token::Update => Ok(Statement::Update(self.parse_update()?)),
            other => Err(self.error(format!("expected SELECT or UPDATE, got {}", other))),
        }
    }

    fn parse_select(&mut self) -> Result<Select> {
        self.expect(&Token::Select)?;

        let mut columns = Vec::new();
        loop {
            let expr = self.parse_expr()?;
            let alias = if self.current() == &Token::As {
                self.advance();
                Some(self.parse_identifier()?)
            } else {
                None
            };
            columns.push(SelectItem { expr, alias });

            if self.current() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        let from = if self.current() == &Token::From {
            self.advance();
            Some(self.parse_identifier()?)
        } else {
            None
        };

        let filter = if from.is_some() && self.current() == &Token::Where {
            self.advance();
            Some(self.parse_condition()?)
        } else {
            None
        };

        Ok(Select {
            columns,
            from,
            filter,
        })
    }

    fn parse_update(&mut self) -> Result<Update> {
        self.expect(&Token::Update)?;
        let table = self.parse_identifier()?;
        self.expect(&Token::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.parse_identifier()?;
            self.expect(&Token::Equal)?;
            let value = self.parse_expr()?;
            assignments.push(Assignment { column, value });

            if self.current() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        let filter = if self.current() == &Token::Where {
            self.advance();
            Some(self.parse_condition()?)
        } else {
            None
        };

        Ok(Update {
            table,
            assignments,
            filter,
        })
    }

    fn parse_condition(&mut self) -> Result<Condition> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Condition> {
        let mut left = self.parse_and()?;
        while self.current() == &Token::Or {
            self.advance();
            let right = self.parse_and()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Condition> {
        let mut left = self.parse_not()?;
        while self.current() == &Token::And {
            self.advance();
            let right = self.parse_not()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Condition> {
        if self.current() == &Token::Not {
            self.advance();
            Ok(Condition::Not(Box::new(self.parse_not()?)))
        } else {
            self.parse_primary_condition()
        }
    }

    /// A parenthesized condition or a single comparison.
    ///
    /// `(` is ambiguous: it can open a grouped condition or a grouped
    /// arithmetic operand. Try the condition reading first and fall back
    /// to a comparison on failure.
    fn parse_primary_condition(&mut self) -> Result<Condition> {
        if self.current() == &Token::LeftParen {
            let save = self.position;
            self.advance();
            if let Ok(condition) = self.parse_or() {
                if self.current() == &Token::RightParen {
                    self.advance();
                    return Ok(condition);
                }
            }
            self.position = save;
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Condition> {
        let left = self.parse_expr()?;

        if self.current() == &Token::Is {
            self.advance();
            let negated = if self.current() == &Token::Not {
                self.advance();
                true
            } else {
                false
            };
            self.expect(&Token::Null)?;
            return Ok(Condition::IsNull {
                expr: left,
                negated,
            });
        }

        let op = match self.current() {
            Token::Equal => CompareOp::Eq,
            Token::NotEqual => CompareOp::NotEq,
            Token::LessThan => CompareOp::Lt,
            Token::LessThanEq => CompareOp::LtEq,
            Token::GreaterThan => CompareOp::Gt,
            Token::GreaterThanEq => CompareOp::GtEq,
            other => {
                return Err(self.error(format!("expected comparison operator, got {}", other)))
            }
        };
        self.advance();
        let right = self.parse_expr()?;

        Ok(Condition::Compare { op, left, right })
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current() {
                Token::Plus => ArithOp::Add,
                Token::Minus => ArithOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.current() {
                Token::Star => ArithOp::Multiply,
                Token::Slash => ArithOp::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        if self.current() == &Token::Minus {
            self.advance();
            Ok(Expr::Neg(Box::new(self.parse_factor()?)))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(Expr::Column(name))
            }
            Token::Integer(n) => {
                self.advance();
                Ok(Expr::Integer(n))
            }
            Token::Float(f) => {
                self.advance();
                Ok(Expr::Float(f))
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }
            other => Err(self.error(format!("unexpected {} in expression", other))),
        }
    }

    // Helper methods

    fn current(&self) -> &Token {
        self.tokens
            .get(self.position)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn current_offset(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|t| t.offset)
            .unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        if std::mem::discriminant(self.current()) == std::mem::discriminant(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {}, got {}", expected, self.current())))
        }
    }

    fn expect_eof(&mut self) -> Result<()> {
        if self.current() == &Token::Eof {
            Ok(())
        } else {
            Err(self.error(format!("unexpected trailing {}", self.current())))
        }
    }

    fn parse_identifier(&mut self) -> Result<String> {
        if let Token::Identifier(name) = self.current() {
            let result = name.clone();
            self.advance();
            Ok(result)
        } else {
            Err(self.error(format!("expected identifier, got {}", self.current())))
        }
    }

    fn error(&self, message: String) -> Error {
        Error::Parse {
            position: self.current_offset(),
            message,
        }
    }
}
