//! Schema description and row reflection.
//!
//! The SQL planner never touches caller state: it resolves table names
//! through [`Schema`] and column names through the static field lists the
//! entity types register via [`Row`]. That descriptor metadata is fixed at
//! compile time, which is what lets plan-time resolution errors surface
//! before any transaction is opened.

use crate::error::Result;
use crate::table::Entity;
use crate::value::Value;
use std::collections::BTreeMap;

/// Object-safe field-by-name view of a row, used by compiled predicates
/// and projections.
pub trait RowFields {
    /// The named field as a [`Value`]; `None` for unknown names.
    fn field(&self, name: &str) -> Option<Value>;
}

/// An entity that participates in SQL: a static field list plus
/// copy-all-override-some row construction.
pub trait Row: Entity + RowFields {
    /// Attribute names, in declaration order.
    fn fields() -> &'static [&'static str];

    /// A new row equal to `self` with the given fields overridden.
    ///
    /// Rows are immutable values, so UPDATE builds a replacement row and
    /// re-`set`s it; that keeps every attached index consistent.
    fn with_updates(&self, updates: &BTreeMap<String, Value>) -> Result<Self>;
}

/// A result-record type a SELECT can project into.
///
/// Binding is by column name, not position, so reordering the select list
/// does not break construction.
pub trait FromRow: Sized {
    /// The column names this record is built from.
    fn columns() -> &'static [&'static str];

    /// Construct from projected values keyed by [`FromRow::columns`] names.
    fn from_values(values: &BTreeMap<String, Value>) -> Result<Self>;
}

/// Read-side dynamic view of a table, as seen by compiled executors.
pub trait DynTable {
    /// Field names of the entity type stored in the table.
    fn field_names(&self) -> &'static [&'static str];

    /// Visit every row in primary-key order.
    fn scan(&self, visit: &mut dyn FnMut(&dyn RowFields) -> Result<()>) -> Result<()>;

    fn row_count(&self) -> usize;
}

/// Write-side dynamic view; available only through a write transaction.
pub trait DynTableMut: DynTable {
    /// Scan in key order, and for every row matching `pred` build a
    /// replacement row with `updates` applied and set it back. Returns the
    /// number of rows updated.
    fn update_matching(
        &mut self,
        pred: &dyn Fn(&dyn RowFields) -> Result<bool>,
        updates: &BTreeMap<String, Value>,
    ) -> Result<usize>;

    /// Reject further index attachment. Called once when the engine binds
    /// the schema.
    fn seal(&mut self);
}

/// A named, statically known set of tables.
///
/// Tables and indexes are created before the engine is constructed, live
/// for the engine's lifetime, and never appear or disappear dynamically.
/// The implementation is mechanical: name each table and route dynamic
/// lookups to the matching field.
pub trait Schema: Clone + Send + Sync + 'static {
    /// Canonical table names, one per table field.
    fn table_names(&self) -> &'static [&'static str];

    fn dyn_table(&self, name: &str) -> Option<&dyn DynTable>;

    fn dyn_table_mut(&mut self, name: &str) -> Option<&mut dyn DynTableMut>;

    /// Canonical name for a case-insensitive table reference.
    fn resolve_name(&self, name: &str) -> Option<&'static str> {
        self.table_names()
            .iter()
            .copied()
            .find(|candidate| candidate.eq_ignore_ascii_case(name))
    }
}

/// Canonical field name for a case-insensitive column reference.
pub(crate) fn resolve_field(fields: &'static [&'static str], name: &str) -> Option<&'static str> {
    fields
        .iter()
        .copied()
        .find(|candidate| candidate.eq_ignore_ascii_case(name))
}
