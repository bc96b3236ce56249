//! Engine: snapshot publication and the two transaction modes.
//!
//! Copy-on-write at commit with a single writer. The published schema sits
//! behind one atomically swapped `Arc`; a reader pins that pointer once at
//! transaction start, so every table it touches belongs to the same
//! publication epoch and cross-table atomicity needs no further
//! coordination. A writer clones the schema into a working copy (row data
//! is `Arc`-shared, so the clone is pointer-shallow), mutates it through
//! its context, and the engine republishes the root in a single swap when
//! the callback returns successfully. Readers never block writers and
//! writers never block readers; writers serialize against each other on a
//! dedicated mutex.

use crate::error::{Error, Result};
use crate::schema::{DynTable, DynTableMut, FromRow, Schema};
use crate::sql_parser::Parser;
use crate::sql_planner::{plan, Plan};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Transactional engine owning a schema of tables and indexes.
pub struct Engine<S: Schema> {
    published: RwLock<Arc<S>>,
    writer: Mutex<()>,
}

impl<S: Schema> Engine<S> {
    /// Bind a schema. Seals every table: index attachment past this point
    /// fails with [`Error::SchemaSealed`].
    pub fn new(mut schema: S) -> Self {
        for name in schema.table_names() {
            if let Some(table) = schema.dyn_table_mut(name) {
                table.seal();
            }
        }
        Engine {
            published: RwLock::new(Arc::new(schema)),
            writer: Mutex::new(()),
        }
    }

    fn snapshot(&self) -> Arc<S> {
        self.published.read().clone()
    }

    /// Run `f` against the snapshot published at call time. May run
    /// concurrently with other read transactions and with a writer.
    pub fn read_transaction<T>(
        &self,
        f: impl FnOnce(&mut ReadContext<S>) -> Result<T>,
    ) -> Result<T> {
        let mut ctx = ReadContext {
            snapshot: self.snapshot(),
        };
        f(&mut ctx)
    }

    /// Run `f` against a private working copy of the schema and publish it
    /// atomically when `f` returns `Ok`. At most one write transaction is
    /// active at any instant.
    ///
    /// On `Err` the working copy is dropped and observable state is
    /// exactly the pre-transaction snapshot; there is no rollback of
    /// individual operations, so callers should validate first and mutate
    /// last.
    pub fn write_transaction<T>(
        &self,
        f: impl FnOnce(&mut WriteContext<S>) -> Result<T>,
    ) -> Result<T> {
        let _writer = self.writer.lock();
        let working = (*self.snapshot()).clone();
        let mut ctx = WriteContext { working };
        let out = f(&mut ctx)?;
        tracing::debug!("publishing write transaction");
        *self.published.write() = Arc::new(ctx.working);
        Ok(out)
    }

    /// Parse, plan, and dispatch a SQL statement.
    ///
    /// Parse and plan errors return before any transaction is opened. A
    /// compiled SELECT runs in a read transaction and yields `Some(rows)`;
    /// a compiled UPDATE runs in a write transaction and yields `None`.
    pub fn execute_sql<R>(&self, sql: &str) -> Result<Option<Vec<R>>>
    where
        R: FromRow + 'static,
    {
        let statement = Parser::parse(sql)?;
        let snapshot = self.snapshot();
        match plan::<S, R>(&statement, &snapshot)? {
            Plan::Read(exec) => self.read_transaction(|ctx| exec(ctx)).map(Some),
            Plan::Write(exec) => {
                self.write_transaction(|ctx| exec(ctx))?;
                Ok(None)
            }
        }
    }
}

/// Read-only transaction context over a pinned snapshot.
pub struct ReadContext<S: Schema> {
    snapshot: Arc<S>,
}

impl<S: Schema> ReadContext<S> {
    /// The schema as of this transaction's snapshot; reach tables and
    /// their indexes through it.
    pub fn schema(&self) -> &S {
        &self.snapshot
    }
}

/// Read-write transaction context over the writer's working copy.
pub struct WriteContext<S: Schema> {
    working: S,
}

impl<S: Schema> WriteContext<S> {
    pub fn schema(&self) -> &S {
        &self.working
    }

    /// Mutable working copy; `&mut Table` unlocks `set` and `delete`.
    pub fn schema_mut(&mut self) -> &mut S {
        &mut self.working
    }
}

/// Dynamic table access for compiled SQL executors, implemented by both
/// context kinds. A read context answers `table_mut` with
/// [`Error::ReadOnlyViolation`].
pub trait SqlContext {
    fn table(&self, name: &str) -> Result<&dyn DynTable>;

    fn table_mut(&mut self, name: &str) -> Result<&mut dyn DynTableMut>;
}

impl<S: Schema> SqlContext for ReadContext<S> {
    fn table(&self, name: &str) -> Result<&dyn DynTable> {
        let canonical = self
            .snapshot
            .resolve_name(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))?;
        self.snapshot
            .dyn_table(canonical)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    fn table_mut(&mut self, _name: &str) -> Result<&mut dyn DynTableMut> {
        Err(Error::ReadOnlyViolation)
    }
}

impl<S: Schema> SqlContext for WriteContext<S> {
    fn table(&self, name: &str) -> Result<&dyn DynTable> {
        let canonical = self
            .working
            .resolve_name(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))?;
        self.working
            .dyn_table(canonical)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut dyn DynTableMut> {
        let canonical = self
            .working
            .resolve_name(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))?;
        self.working
            .dyn_table_mut(canonical)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }
}
