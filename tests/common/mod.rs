//! Shared fixture: a small library schema with books and orders.

#![allow(dead_code)]

use std::collections::BTreeMap;
use tabula::{
    DynTable, DynTableMut, Engine, Entity, Error, FromRow, Result, Row, RowFields, Schema, Table,
    Value,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub quantity: i64,
}

impl Entity for Book {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

impl RowFields for Book {
    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::Int(self.id)),
            "title" => Some(Value::Str(self.title.clone())),
            "quantity" => Some(Value::Int(self.quantity)),
            _ => None,
        }
    }
}

impl Row for Book {
    fn fields() -> &'static [&'static str] {
        &["id", "title", "quantity"]
    }

    fn with_updates(&self, updates: &BTreeMap<String, Value>) -> Result<Self> {
        let mut next = self.clone();
        for (field, value) in updates {
            match field.as_str() {
                "id" => {
                    next.id = value.to_i64().ok_or_else(|| Error::FieldType {
                        field: field.clone(),
                        expected: "integer",
                    })?
                }
                "quantity" => {
                    next.quantity = value.to_i64().ok_or_else(|| Error::FieldType {
                        field: field.clone(),
                        expected: "integer",
                    })?
                }
                "title" => {
                    next.title = value
                        .as_str()
                        .ok_or_else(|| Error::FieldType {
                            field: field.clone(),
                            expected: "string",
                        })?
                        .to_string()
                }
                other => {
                    return Err(Error::UnknownColumn {
                        table: "books".to_string(),
                        column: other.to_string(),
                    })
                }
            }
        }
        Ok(next)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub book_id: i64,
    pub note: Option<i64>,
}

impl Entity for Order {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

impl RowFields for Order {
    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::Int(self.id)),
            "book_id" => Some(Value::Int(self.book_id)),
            "note" => Some(Value::from(self.note)),
            _ => None,
        }
    }
}

impl Row for Order {
    fn fields() -> &'static [&'static str] {
        &["id", "book_id", "note"]
    }

    fn with_updates(&self, updates: &BTreeMap<String, Value>) -> Result<Self> {
        let mut next = self.clone();
        for (field, value) in updates {
            match field.as_str() {
                "id" => {
                    next.id = value.to_i64().ok_or_else(|| Error::FieldType {
                        field: field.clone(),
                        expected: "integer",
                    })?
                }
                "book_id" => {
                    next.book_id = value.to_i64().ok_or_else(|| Error::FieldType {
                        field: field.clone(),
                        expected: "integer",
                    })?
                }
                "note" => next.note = value.to_i64(),
                other => {
                    return Err(Error::UnknownColumn {
                        table: "orders".to_string(),
                        column: other.to_string(),
                    })
                }
            }
        }
        Ok(next)
    }
}

#[derive(Clone)]
pub struct LibrarySchema {
    pub books: Table<Book>,
    pub orders: Table<Order>,
}

impl LibrarySchema {
    pub fn new() -> Self {
        let mut books = Table::new();
        books
            .add_range_index("quantity", |b: &Book| b.quantity)
            .unwrap();

        let mut orders = Table::new();
        orders
            .add_value_index("book_id", |o: &Order| o.book_id)
            .unwrap();

        LibrarySchema { books, orders }
    }
}

impl Schema for LibrarySchema {
    fn table_names(&self) -> &'static [&'static str] {
        &["books", "orders"]
    }

    fn dyn_table(&self, name: &str) -> Option<&dyn DynTable> {
        match name {
            "books" => Some(&self.books),
            "orders" => Some(&self.orders),
            _ => None,
        }
    }

    fn dyn_table_mut(&mut self, name: &str) -> Option<&mut dyn DynTableMut> {
        match name {
            "books" => Some(&mut self.books),
            "orders" => Some(&mut self.orders),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookSummary {
    pub id: i64,
    pub quantity: i64,
}

impl FromRow for BookSummary {
    fn columns() -> &'static [&'static str] {
        &["id", "quantity"]
    }

    fn from_values(values: &BTreeMap<String, Value>) -> Result<Self> {
        let int = |name: &str| {
            values
                .get(name)
                .and_then(|v| v.to_i64())
                .ok_or_else(|| Error::FieldType {
                    field: name.to_string(),
                    expected: "integer",
                })
        };
        Ok(BookSummary {
            id: int("id")?,
            quantity: int("quantity")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderNote {
    pub id: i64,
    pub note: Option<i64>,
}

impl FromRow for OrderNote {
    fn columns() -> &'static [&'static str] {
        &["id", "note"]
    }

    fn from_values(values: &BTreeMap<String, Value>) -> Result<Self> {
        Ok(OrderNote {
            id: values
                .get("id")
                .and_then(|v| v.to_i64())
                .ok_or_else(|| Error::FieldType {
                    field: "id".to_string(),
                    expected: "integer",
                })?,
            note: values.get("note").and_then(|v| v.to_i64()),
        })
    }
}

pub fn library_engine() -> Engine<LibrarySchema> {
    Engine::new(LibrarySchema::new())
}

/// Insert books with ids `1..=count`, each titled `book_<id>` with
/// quantity 1.
pub fn seed_books(engine: &Engine<LibrarySchema>, count: i64) {
    engine
        .write_transaction(|ctx| {
            for id in 1..=count {
                ctx.schema_mut().books.set(Book {
                    id,
                    title: format!("book_{}", id),
                    quantity: 1,
                });
            }
            Ok(())
        })
        .unwrap();
}
