//! Relation Resolver
//!
//! A relation field is a named alias for a foreign-key column whose value is a
//! row of another table. Before a statement is built, payloads and filters are
//! folded so that relation fields become their foreign-key column holding the
//! referenced id.

use crate::codec;
use crate::error::{DbxError, DbxResult};
use crate::filter::{Condition, Filter};
use crate::record::Patch;
use crate::schema::Relation;
use crate::table::Table;
use crate::value::{ScalarValue, Value};
use std::collections::BTreeMap;

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Integer(_) => "integer",
        Value::Real(_) => "real",
        Value::Text(_) => "text",
        Value::Blob(_) => "blob",
        Value::Timestamp(_) => "timestamp",
        Value::Json(_) => "json",
        Value::Row(_) => "row",
    }
}

/// Referenced id of a value assigned to `relation`; `None` for null.
fn referenced_id(relation: &Relation, value: &Value) -> DbxResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Row(row) if row.table == relation.target => Ok(Some(row.id)),
        Value::Row(row) => Err(DbxError::type_mismatch(
            format!("row of '{}'", relation.target),
            format!("row of '{}'", row.table),
        )),
        other => Err(DbxError::type_mismatch(
            format!("row of '{}'", relation.target),
            value_kind(other),
        )),
    }
}

/// Fail with `ImmutableId` unless `value` names the same id.
pub(crate) fn check_same_id(table: &str, value: &Value, id: i64) -> DbxResult<()> {
    match codec::to_storage(value.clone())? {
        ScalarValue::Integer(given) if given == id => Ok(()),
        _ => Err(DbxError::ImmutableId {
            table: table.to_string(),
        }),
    }
}

fn conflict(table: &Table, column: &str) -> DbxError {
    DbxError::InvalidOperation {
        message: format!("conflicting values for '{column}' and its relation field"),
        context: format!("table '{}'", table.name()),
    }
}

/// Fold a write payload into column → stored value.
///
/// `id` passes through as a column; callers decide whether it is allowed.
pub(crate) fn fold_patch(table: &Table, patch: Patch) -> DbxResult<BTreeMap<String, ScalarValue>> {
    let mut values: BTreeMap<String, ScalarValue> = BTreeMap::new();
    for (field, value) in patch {
        let (column, stored) = if field == "id" || table.has_column(&field) {
            (field, codec::to_storage(value)?)
        } else if let Some(relation) = table.relation(&field) {
            let stored = match referenced_id(relation, &value)? {
                Some(id) => ScalarValue::Integer(id),
                None => ScalarValue::Null,
            };
            (relation.foreign_key.clone(), stored)
        } else {
            return Err(DbxError::unknown_column(table.name(), &field));
        };

        if let Some(existing) = values.get(&column) {
            if *existing != stored {
                return Err(conflict(table, &column));
            }
            continue;
        }
        values.insert(column, stored);
    }
    Ok(values)
}

/// Fold relation fields of a filter into foreign-key conditions.
pub(crate) fn fold_filter(table: &Table, filter: &Filter) -> DbxResult<Filter> {
    let mut folded = Filter::new();
    for (field, condition) in filter.iter() {
        let (column, condition) = if field == "id" || table.has_column(field) {
            (field.clone(), condition.clone())
        } else if let Some(relation) = table.relation(field) {
            let condition = match condition {
                Condition::IsNull => Condition::IsNull,
                Condition::IsNotNull => Condition::IsNotNull,
                Condition::Equals(value) => match referenced_id(relation, value)? {
                    Some(id) => Condition::Equals(Value::Integer(id)),
                    None => Condition::IsNull,
                },
            };
            (relation.foreign_key.clone(), condition)
        } else {
            return Err(DbxError::unknown_column(table.name(), field));
        };

        if let Some(existing) = folded.get(&column) {
            if *existing != condition {
                return Err(conflict(table, &column));
            }
            continue;
        }
        folded = folded.with_condition(column, condition);
    }
    Ok(folded)
}
