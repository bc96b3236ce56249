//! SQL planner: compiles an AST into a reusable executor closure.
//!
//! Planning resolves every name against the schema's descriptor metadata,
//! so resolution failures surface before any transaction is opened. The
//! compiled executor is a plain closure over the dynamic table surface:
//! scan in key order, filter, then project (SELECT) or rebuild-and-set
//! (UPDATE). There is no optimizer and no index selection; scans are the
//! only access path.

use crate::engine::SqlContext;
use crate::error::{Error, Result};
use crate::schema::{resolve_field, FromRow, RowFields, Schema};
use crate::sql_ast::{CompareOp, Condition, Expr, Select, Statement, Update};
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Compiled read executor: runs inside a read transaction.
pub type ReadExecutor<R> = Box<dyn Fn(&dyn SqlContext) -> Result<Vec<R>> + Send + Sync>;

/// Compiled write executor: runs inside a write transaction.
pub type WriteExecutor = Box<dyn Fn(&mut dyn SqlContext) -> Result<()> + Send + Sync>;

/// A compiled statement, tagged with the transaction mode it requires.
pub enum Plan<R> {
    Read(ReadExecutor<R>),
    Write(WriteExecutor),
}

/// Compile a parsed statement against the schema's metadata.
pub fn plan<S, R>(statement: &Statement, schema: &S) -> Result<Plan<R>>
where
    S: Schema,
    R: FromRow + 'static,
{
    match statement {
        Statement::Select(select) => plan_select::<S, R>(select, schema).map(Plan::Read),
        Statement::Update(update) => plan_update::<S>(update, schema).map(Plan::Write),
    }
}

/// A compiled scalar operand: a resolved entity field or a constant.
#[derive(Clone)]
enum Scalar {
    Field(&'static str),
    Const(Value),
}

impl Scalar {
    fn eval(&self, row: &dyn RowFields) -> Value {
        match self {
            Scalar::Field(name) => row.field(name).unwrap_or(Value::Null),
            Scalar::Const(value) => value.clone(),
        }
    }
}

type Predicate = Box<dyn Fn(&dyn RowFields) -> Result<bool> + Send + Sync>;

/// Fold a constant expression, including unary minus on numeric literals.
fn fold_const(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Integer(n) => Some(Value::Int(*n)),
        Expr::Float(f) => Some(Value::Float(*f)),
        Expr::Neg(inner) => match fold_const(inner)? {
            Value::Int(n) => Some(Value::Int(-n)),
            Value::Float(f) => Some(Value::Float(-f)),
            _ => None,
        },
        _ => None,
    }
}

fn compile_scalar(
    expr: &Expr,
    table: &str,
    fields: &'static [&'static str],
    position: &'static str,
) -> Result<Scalar> {
    if let Some(value) = fold_const(expr) {
        return Ok(Scalar::Const(value));
    }
    match expr {
        Expr::Column(name) => resolve_field(fields, name)
            .map(Scalar::Field)
            .ok_or_else(|| Error::UnknownColumn {
                table: table.to_string(),
                column: name.clone(),
            }),
        _ => Err(Error::NotImplemented(format!("arithmetic in {}", position))),
    }
}

fn compile_condition(
    condition: &Condition,
    table: &str,
    fields: &'static [&'static str],
) -> Result<Predicate> {
    match condition {
        Condition::And(a, b) => {
            let left = compile_condition(a, table, fields)?;
            let right = compile_condition(b, table, fields)?;
            Ok(Box::new(move |row| Ok(left(row)? && right(row)?)))
        }
        Condition::Or(a, b) => {
            let left = compile_condition(a, table, fields)?;
            let right = compile_condition(b, table, fields)?;
            Ok(Box::new(move |row| Ok(left(row)? || right(row)?)))
        }
        Condition::Not(inner) => {
            let inner = compile_condition(inner, table, fields)?;
            Ok(Box::new(move |row| Ok(!inner(row)?)))
        }
        Condition::Compare { op, left, right } => {
            let left = compile_scalar(left, table, fields, "comparison operands")?;
            let right = compile_scalar(right, table, fields, "comparison operands")?;
            let op = *op;
            // NULL and incomparable operands collapse to false for every
            // comparison operator, including <>.
            Ok(Box::new(move |row| {
                let outcome = left.eval(row).compare(&right.eval(row));
                Ok(match outcome {
                    None => false,
                    Some(ordering) => match op {
                        CompareOp::Eq => ordering == Ordering::Equal,
                        CompareOp::NotEq => ordering != Ordering::Equal,
                        CompareOp::Lt => ordering == Ordering::Less,
                        CompareOp::LtEq => ordering != Ordering::Greater,
                        CompareOp::Gt => ordering == Ordering::Greater,
                        CompareOp::GtEq => ordering != Ordering::Less,
                    },
                })
            }))
        }
        Condition::IsNull { expr, negated } => {
            let scalar = compile_scalar(expr, table, fields, "IS NULL operands")?;
            let negated = *negated;
            Ok(Box::new(move |row| Ok(scalar.eval(row).is_null() != negated)))
        }
    }
}

fn resolve_table<'a, S: Schema>(
    schema: &'a S,
    name: &str,
) -> Result<(&'static str, &'static [&'static str])> {
    let canonical = schema
        .resolve_name(name)
        .ok_or_else(|| Error::UnknownTable(name.to_string()))?;
    let fields = schema
        .dyn_table(canonical)
        .ok_or_else(|| Error::UnknownTable(name.to_string()))?
        .field_names();
    Ok((canonical, fields))
}

fn plan_select<S, R>(select: &Select, schema: &S) -> Result<ReadExecutor<R>>
where
    S: Schema,
    R: FromRow + 'static,
{
    let from = select
        .from
        .as_ref()
        .ok_or_else(|| Error::NotImplemented("SELECT without a FROM clause".to_string()))?;
    let (table, fields) = resolve_table(schema, from)?;

    // Resolve every projected expression up front so an unknown column is
    // reported even when the result type does not consume it.
    struct Projected {
        output: Option<String>,
        source: Scalar,
    }
    let mut projected = Vec::new();
    for item in &select.columns {
        let source = compile_scalar(&item.expr, table, fields, "projections")?;
        let output = item.alias.clone().or_else(|| match &item.expr {
            Expr::Column(name) => Some(name.clone()),
            _ => None,
        });
        projected.push(Projected { output, source });
    }

    // Bind each result column: a projection with a matching alias/name
    // wins, otherwise a same-named source attribute passes through.
    let mut bindings: Vec<(&'static str, Scalar)> = Vec::new();
    for &column in R::columns() {
        let source = projected
            .iter()
            .find(|p| {
                p.output
                    .as_deref()
                    .is_some_and(|output| output.eq_ignore_ascii_case(column))
            })
            .map(|p| p.source.clone())
            .or_else(|| resolve_field(fields, column).map(Scalar::Field));
        match source {
            Some(source) => bindings.push((column, source)),
            None => return Err(Error::ColumnBinding(column.to_string())),
        }
    }

    let pred = select
        .filter
        .as_ref()
        .map(|condition| compile_condition(condition, table, fields))
        .transpose()?;

    tracing::trace!(table, columns = bindings.len(), "compiled SELECT");

    Ok(Box::new(move |ctx: &dyn SqlContext| {
        let source = ctx.table(table)?;
        let mut out = Vec::new();
        source.scan(&mut |row| {
            if let Some(pred) = &pred {
                if !pred(row)? {
                    return Ok(());
                }
            }
            let mut values = BTreeMap::new();
            for (name, scalar) in &bindings {
                values.insert(name.to_string(), scalar.eval(row));
            }
            out.push(R::from_values(&values)?);
            Ok(())
        })?;
        Ok(out)
    }))
}

fn plan_update<S: Schema>(update: &Update, schema: &S) -> Result<WriteExecutor> {
    let (table, fields) = resolve_table(schema, &update.table)?;

    let mut updates: BTreeMap<String, Value> = BTreeMap::new();
    for assignment in &update.assignments {
        let column = resolve_field(fields, &assignment.column).ok_or_else(|| {
            Error::UnknownColumn {
                table: table.to_string(),
                column: assignment.column.clone(),
            }
        })?;
        let value = fold_const(&assignment.value)
            .ok_or_else(|| Error::NotImplemented("arithmetic in SET values".to_string()))?;
        updates.insert(column.to_string(), value);
    }

    let pred = update
        .filter
        .as_ref()
        .map(|condition| compile_condition(condition, table, fields))
        .transpose()?;

    tracing::trace!(table, assignments = updates.len(), "compiled UPDATE");

    Ok(Box::new(move |ctx: &mut dyn SqlContext| {
        let target = ctx.table_mut(table)?;
        let match_all = |_: &dyn RowFields| -> Result<bool> { Ok(true) };
        let pred_ref: &dyn Fn(&dyn RowFields) -> Result<bool> = match &pred {
            Some(pred) => pred.as_ref(),
            None => &match_all,
        };
        let matched = target.update_matching(pred_ref, &updates)?;
        tracing::trace!(table, rows = matched, "UPDATE applied");
        Ok(())
    }))
}
