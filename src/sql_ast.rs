//! SQL abstract syntax tree.
//!
//! Logical conditions and arithmetic expressions are separate types,
//! mirroring the grammar's `logical` / `expr` split.

use serde::{Deserialize, Serialize};

/// Top-level statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Select(Select),
    Update(Update),
}

/// `SELECT select_list [FROM table [WHERE logical]]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    pub columns: Vec<SelectItem>,
    pub from: Option<String>,
    pub filter: Option<Condition>,
}

/// One projected expression with an optional `AS` alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

/// `UPDATE table SET set_list [WHERE logical]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub filter: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}

/// Boolean conditions for WHERE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    Compare {
        op: CompareOp,
        left: Expr,
        right: Expr,
    },
    IsNull {
        expr: Expr,
        negated: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,     // =
    NotEq,  // <>
    Lt,     // <
    LtEq,   // <=
    Gt,     // >
    GtEq,   // >=
}

/// Arithmetic expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Column(String),
    Integer(i64),
    Float(f64),
    Neg(Box<Expr>),
    Binary {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Expr {
    pub fn column(name: &str) -> Self {
        Expr::Column(name.to_string())
    }

    pub fn integer(n: i64) -> Self {
        Expr::Integer(n)
    }
}
