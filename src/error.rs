//! Error taxonomy for the storage engine and SQL frontend.
//!
//! Planner errors surface before any transaction is opened; execution
//! errors abandon the current transaction and propagate to the caller.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// SQL lexing or parsing failed. `position` is the character offset
    /// of the offending input.
    #[error("parse error at offset {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown column {column} on table {table}")]
    UnknownColumn { table: String, column: String },

    /// A result-record field matched neither a projected expression nor a
    /// same-named pass-through attribute of the source entity.
    #[error("result field '{0}' cannot be bound to any projected or source column")]
    ColumnBinding(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("mutation attempted through a read-only transaction")]
    ReadOnlyViolation,

    /// Index attachment after the engine has bound the schema.
    #[error("schema is sealed; indexes can only be added before the engine starts")]
    SchemaSealed,

    /// No index with this name and secondary-key type on the table.
    #[error("unknown index: {0}")]
    UnknownIndex(String),

    /// A `Value` could not be converted while building or projecting a row.
    #[error("field '{field}' does not hold a {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
    },

    /// A transaction callback failed for a caller-defined reason.
    #[error("transaction callback failed: {0}")]
    Callback(String),
}
