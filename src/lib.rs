//! tabula - In-Process Transactional Table Store
//!
//! Memory-resident entity tables with secondary indexes, snapshot-isolated
//! read transactions, serialized copy-on-write write transactions, and a
//! small SQL frontend compiling SELECT/UPDATE into executable transactions.
//!
//! # Architecture
//!
//! - Storage Layer: primary-key tables with value and range-scan indexes
//! - Engine Layer: single-writer, many-reader snapshot publication
//! - SQL Layer: lexer, parser, and a planner emitting executor closures
//! - Schema Layer: descriptor metadata binding SQL names to typed tables

pub mod engine;
pub mod error;
pub mod index;
pub mod schema;
pub mod table;
pub mod value;

// SQL frontend modules
pub mod sql_ast;
pub mod sql_lexer;
pub mod sql_parser;
pub mod sql_planner;

pub use engine::{Engine, ReadContext, SqlContext, WriteContext};
pub use error::{Error, Result};
pub use index::{RangeIndex, ValueIndex};
pub use schema::{DynTable, DynTableMut, FromRow, Row, RowFields, Schema};
pub use table::{Entity, Table};
pub use value::Value;

// SQL exports
pub use sql_ast::Statement;
pub use sql_parser::Parser as SqlParser;
pub use sql_planner::{plan, Plan};
