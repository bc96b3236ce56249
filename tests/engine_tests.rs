//! Engine-level tests: transaction semantics, snapshot isolation,
//! cross-table atomicity, and secondary-index consistency.

mod common;

use common::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tabula::{plan, Error, Plan, SqlParser, Statement};

#[test]
fn test_set_then_get_round_trip() {
    let engine = library_engine();

    engine
        .write_transaction(|ctx| {
            ctx.schema_mut().books.set(Book {
                id: 1,
                title: "book_1".to_string(),
                quantity: 4,
            });
            // Visible within the same transaction.
            assert_eq!(ctx.schema().books.get(&1).unwrap().quantity, 4);
            Ok(())
        })
        .unwrap();

    // And in a subsequent one.
    engine
        .read_transaction(|ctx| {
            let book = ctx.schema().books.get(&1).unwrap();
            assert_eq!(book.title, "book_1");
            assert_eq!(book.quantity, 4);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_missing_key_is_absence_not_error() {
    let engine = library_engine();
    engine
        .read_transaction(|ctx| {
            assert!(ctx.schema().books.get(&42).is_none());
            assert!(!ctx.schema().books.contains(&42));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_order_index_tracks_deletes() {
    // Three orders against one book; delete one; the index must return
    // exactly the two remaining orders.
    let engine = library_engine();

    engine
        .write_transaction(|ctx| {
            for id in 1..=3 {
                ctx.schema_mut().orders.set(Order {
                    id,
                    book_id: 7,
                    note: None,
                });
            }
            Ok(())
        })
        .unwrap();

    engine
        .write_transaction(|ctx| {
            assert!(ctx.schema_mut().orders.delete(&2));
            Ok(())
        })
        .unwrap();

    engine
        .read_transaction(|ctx| {
            let hits = ctx.schema().orders.find("book_id", &7i64)?;
            let mut ids: Vec<i64> = hits.iter().map(|o| o.id).collect();
            ids.sort_unstable();
            assert_eq!(ids, vec![1, 3]);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_range_index_bounds() {
    let engine = library_engine();

    engine
        .write_transaction(|ctx| {
            for (id, quantity) in [(1, 10), (2, 20), (3, 30), (4, 40)] {
                ctx.schema_mut().books.set(Book {
                    id,
                    title: format!("book_{}", id),
                    quantity,
                });
            }
            Ok(())
        })
        .unwrap();

    engine
        .read_transaction(|ctx| {
            let books = &ctx.schema().books;
            let ids = |rows: Vec<Book>| rows.into_iter().map(|b| b.id).collect::<Vec<_>>();

            assert_eq!(
                ids(books.range("quantity", Some(&20i64), true, Some(&30i64), true)?),
                vec![2, 3]
            );
            assert_eq!(
                ids(books.range("quantity", Some(&20i64), false, Some(&40i64), false)?),
                vec![3]
            );
            assert_eq!(
                ids(books.range("quantity", None, true, Some(&20i64), true)?),
                vec![1, 2]
            );
            assert_eq!(
                ids(books.range::<i64>("quantity", None, true, None, true)?),
                vec![1, 2, 3, 4]
            );
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_failed_write_publishes_nothing() {
    let engine = library_engine();
    seed_books(&engine, 3);

    let result: Result<(), Error> = engine.write_transaction(|ctx| {
        ctx.schema_mut().books.set(Book {
            id: 1,
            title: "mutated".to_string(),
            quantity: 99,
        });
        ctx.schema_mut().books.delete(&2);
        Err(Error::Callback("validation failed".to_string()))
    });
    assert_eq!(result, Err(Error::Callback("validation failed".to_string())));

    engine
        .read_transaction(|ctx| {
            assert_eq!(ctx.schema().books.get(&1).unwrap().title, "book_1");
            assert!(ctx.schema().books.contains(&2));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_reader_snapshot_is_pinned() {
    let engine = library_engine();
    seed_books(&engine, 1);

    engine
        .read_transaction(|ctx| {
            let before = ctx.schema().books.get(&1).unwrap().quantity;

            engine
                .write_transaction(|w| {
                    let mut book = w.schema().books.get(&1).unwrap();
                    book.quantity = 99;
                    w.schema_mut().books.set(book);
                    Ok(())
                })
                .unwrap();

            // The pinned snapshot still shows pre-write state, even for a
            // table first touched after the publication.
            assert_eq!(ctx.schema().books.get(&1).unwrap().quantity, before);
            assert!(ctx.schema().orders.is_empty());
            Ok(())
        })
        .unwrap();

    // A transaction started after the publication sees the write.
    engine
        .read_transaction(|ctx| {
            assert_eq!(ctx.schema().books.get(&1).unwrap().quantity, 99);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_multi_table_write_is_atomic() {
    let engine = library_engine();

    engine
        .write_transaction(|ctx| {
            ctx.schema_mut().books.set(Book {
                id: 5,
                title: "book_5".to_string(),
                quantity: 1,
            });
            ctx.schema_mut().orders.set(Order {
                id: 50,
                book_id: 5,
                note: None,
            });
            Ok(())
        })
        .unwrap();

    engine
        .read_transaction(|ctx| {
            assert!(ctx.schema().books.contains(&5));
            assert!(ctx.schema().orders.contains(&50));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_write_transaction_returns_value() {
    let engine = library_engine();
    seed_books(&engine, 4);

    let count = engine
        .write_transaction(|ctx| {
            ctx.schema_mut().books.delete(&4);
            Ok(ctx.schema().books.len())
        })
        .unwrap();
    assert_eq!(count, 3);
}

#[test]
fn test_index_attachment_rejected_after_engine_start() {
    let engine = library_engine();

    let result = engine.write_transaction(|ctx| {
        ctx.schema_mut()
            .books
            .add_value_index("late", |b: &Book| b.quantity)
    });
    assert_eq!(result, Err(Error::SchemaSealed));
}

#[test]
fn test_write_plan_through_read_context_is_rejected() {
    let engine = library_engine();
    seed_books(&engine, 1);

    let statement = SqlParser::parse("UPDATE books SET quantity = 9").unwrap();
    let compiled = plan::<LibrarySchema, BookSummary>(&statement, &LibrarySchema::new()).unwrap();
    let exec = match compiled {
        Plan::Write(exec) => exec,
        Plan::Read(_) => panic!("UPDATE must compile to a write plan"),
    };

    let result = engine.read_transaction(|ctx| exec(ctx));
    assert_eq!(result, Err(Error::ReadOnlyViolation));

    // The rejected executor must not have touched anything.
    engine
        .read_transaction(|ctx| {
            assert_eq!(ctx.schema().books.get(&1).unwrap().quantity, 1);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_parse_statement_shapes() {
    assert!(matches!(
        SqlParser::parse("SELECT id FROM books").unwrap(),
        Statement::Select(_)
    ));
    assert!(matches!(
        SqlParser::parse("UPDATE books SET quantity = 1").unwrap(),
        Statement::Update(_)
    ));
}

#[test]
fn test_concurrent_readers_with_one_writer() {
    // One writer keeps books[1].quantity and orders[1].book_id in lockstep
    // across many transactions; readers must never observe the two tables
    // out of step, and the order index must always agree with the row.
    const STEPS: i64 = 200;

    let engine = library_engine();
    engine
        .write_transaction(|ctx| {
            ctx.schema_mut().books.set(Book {
                id: 1,
                title: "book_1".to_string(),
                quantity: 0,
            });
            ctx.schema_mut().orders.set(Order {
                id: 1,
                book_id: 0,
                note: None,
            });
            Ok(())
        })
        .unwrap();

    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    engine
                        .read_transaction(|ctx| {
                            let book = ctx.schema().books.get(&1).unwrap();
                            let order = ctx.schema().orders.get(&1).unwrap();

                            // Cross-table atomicity: both tables reflect
                            // the same write transaction.
                            assert_eq!(book.quantity, order.book_id);

                            // Index consistency on every observation.
                            let hits = ctx.schema().orders.find("book_id", &order.book_id)?;
                            assert!(hits.iter().any(|o| o.id == 1));
                            Ok(())
                        })
                        .unwrap();
                }
            });
        }

        for step in 1..=STEPS {
            engine
                .write_transaction(|ctx| {
                    ctx.schema_mut().books.set(Book {
                        id: 1,
                        title: "book_1".to_string(),
                        quantity: step,
                    });
                    ctx.schema_mut().orders.set(Order {
                        id: 1,
                        book_id: step,
                        note: None,
                    });
                    Ok(())
                })
                .unwrap();
        }
        done.store(true, Ordering::Release);
    });

    engine
        .read_transaction(|ctx| {
            assert_eq!(ctx.schema().books.get(&1).unwrap().quantity, STEPS);
            assert_eq!(ctx.schema().orders.get(&1).unwrap().book_id, STEPS);
            Ok(())
        })
        .unwrap();
}
