//! Primary store: mapping from primary key to immutable row.
//!
//! A table owns its rows and every index attached to it. Mutation is only
//! reachable through `&mut Table`, which only a write transaction hands
//! out; read transactions observe a pinned snapshot. Rows are shared
//! behind `Arc` so cloning a table for a copy-on-write working set copies
//! pointers, not row data.

use crate::error::{Error, Result};
use crate::index::{AnyIndex, RangeIndex, ValueIndex};
use crate::schema::{DynTable, DynTableMut, Row, RowFields};
use crate::value::Value;
use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::Arc;

/// A row type with a stable primary key.
///
/// Keys are totally ordered and hashable. Rows are immutable values: a
/// write replaces the row wholesale, it never mutates in place.
pub trait Entity: Clone + Send + Sync + 'static {
    type Key: Ord + Hash + Clone + Send + Sync + 'static;

    fn key(&self) -> Self::Key;
}

struct IndexSlot<E: Entity> {
    name: &'static str,
    index: Box<dyn AnyIndex<E>>,
}

impl<E: Entity> Clone for IndexSlot<E> {
    fn clone(&self) -> Self {
        IndexSlot {
            name: self.name,
            index: self.index.clone_box(),
        }
    }
}

/// Mapping from primary key to row, with ordered key iteration and zero
/// or more attached secondary indexes.
pub struct Table<E: Entity> {
    rows: BTreeMap<E::Key, Arc<E>>,
    indexes: Vec<IndexSlot<E>>,
    sealed: bool,
}

impl<E: Entity> Clone for Table<E> {
    fn clone(&self) -> Self {
        Table {
            rows: self.rows.clone(),
            indexes: self.indexes.clone(),
            sealed: self.sealed,
        }
    }
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Table<E> {
    pub fn new() -> Self {
        Table {
            rows: BTreeMap::new(),
            indexes: Vec::new(),
            sealed: false,
        }
    }

    /// The row for `key`. Absence is not an error.
    pub fn get(&self, key: &E::Key) -> Option<E> {
        self.rows.get(key).map(|row| (**row).clone())
    }

    pub fn contains(&self, key: &E::Key) -> bool {
        self.rows.contains_key(key)
    }

    /// Establish `rows[row.key()] = row` and refresh every attached index.
    ///
    /// If a row already existed under that key, its index entries are
    /// removed before the new row's entries are added.
    pub fn set(&mut self, row: E) {
        let key = row.key();
        if let Some(old) = self.rows.get(&key).cloned() {
            for slot in &mut self.indexes {
                slot.index.remove(&old);
            }
        }
        let row = Arc::new(row);
        for slot in &mut self.indexes {
            slot.index.insert(&row);
        }
        self.rows.insert(key, row);
    }

    /// Remove the row and all index entries derived from it. Returns
    /// whether a row was present.
    pub fn delete(&mut self, key: &E::Key) -> bool {
        match self.rows.remove(key) {
            Some(old) => {
                for slot in &mut self.indexes {
                    slot.index.remove(&old);
                }
                true
            }
            None => false,
        }
    }

    /// Lazy scan over the table's keys in key order, stable within one
    /// transaction.
    pub fn ids(&self) -> impl Iterator<Item = &E::Key> {
        self.rows.keys()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Attach a value index. Schema-construction time only.
    pub fn add_value_index<S>(&mut self, name: &'static str, extract: fn(&E) -> S) -> Result<()>
    where
        S: Hash + Eq + Clone + Send + Sync + 'static,
    {
        if self.sealed {
            return Err(Error::SchemaSealed);
        }
        let mut index = ValueIndex::new(extract);
        for row in self.rows.values() {
            index.insert(row);
        }
        self.indexes.push(IndexSlot {
            name,
            index: Box::new(index),
        });
        Ok(())
    }

    /// Attach a range-scan index. Schema-construction time only.
    pub fn add_range_index<S>(&mut self, name: &'static str, extract: fn(&E) -> S) -> Result<()>
    where
        S: Ord + Clone + Send + Sync + 'static,
    {
        if self.sealed {
            return Err(Error::SchemaSealed);
        }
        let mut index = RangeIndex::new(extract);
        for row in self.rows.values() {
            index.insert(row);
        }
        self.indexes.push(IndexSlot {
            name,
            index: Box::new(index),
        });
        Ok(())
    }

    /// Rows whose extracted value equals `key`, via the named value index.
    pub fn find<S>(&self, name: &str, key: &S) -> Result<Vec<E>>
    where
        S: Hash + Eq + Clone + Send + Sync + 'static,
    {
        let index = self
            .index_slot(name)?
            .as_any()
            .downcast_ref::<ValueIndex<E, S>>()
            .ok_or_else(|| Error::UnknownIndex(name.to_string()))?;
        Ok(index
            .keys_for(key)
            .filter_map(|k| self.rows.get(k))
            .map(|row| (**row).clone())
            .collect())
    }

    /// Rows whose extracted value lies within the bounds, ascending by the
    /// extracted key, via the named range index. Bounds are each optional
    /// and independently inclusive or exclusive.
    pub fn range<S>(
        &self,
        name: &str,
        lo: Option<&S>,
        lo_inclusive: bool,
        hi: Option<&S>,
        hi_inclusive: bool,
    ) -> Result<Vec<E>>
    where
        S: Ord + Clone + Send + Sync + 'static,
    {
        let index = self
            .index_slot(name)?
            .as_any()
            .downcast_ref::<RangeIndex<E, S>>()
            .ok_or_else(|| Error::UnknownIndex(name.to_string()))?;
        Ok(index
            .keys_in(lo, lo_inclusive, hi, hi_inclusive)
            .iter()
            .filter_map(|k| self.rows.get(k))
            .map(|row| (**row).clone())
            .collect())
    }

    fn index_slot(&self, name: &str) -> Result<&dyn AnyIndex<E>> {
        self.indexes
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| slot.index.as_ref())
            .ok_or_else(|| Error::UnknownIndex(name.to_string()))
    }
}

impl<E: Row> DynTable for Table<E> {
    fn field_names(&self) -> &'static [&'static str] {
        E::fields()
    }

    fn scan(&self, visit: &mut dyn FnMut(&dyn RowFields) -> Result<()>) -> Result<()> {
        for row in self.rows.values() {
            visit(&**row)?;
        }
        Ok(())
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl<E: Row> DynTableMut for Table<E> {
    fn update_matching(
        &mut self,
        pred: &dyn Fn(&dyn RowFields) -> Result<bool>,
        updates: &BTreeMap<String, Value>,
    ) -> Result<usize> {
        // Match first, mutate after: updates may re-key rows.
        let mut matched: Vec<E::Key> = Vec::new();
        for (key, row) in &self.rows {
            if pred(&**row)? {
                matched.push(key.clone());
            }
        }
        for key in &matched {
            if let Some(row) = self.rows.get(key) {
                let next = row.with_updates(updates)?;
                self.set(next);
            }
        }
        Ok(matched.len())
    }

    fn seal(&mut self) {
        self.sealed = true;
    }
}
