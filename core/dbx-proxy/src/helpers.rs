//! Find-or-insert helpers built on the table operations

use crate::error::{DbxError, DbxResult};
use crate::filter::{Condition, Filter};
use crate::record::Patch;
use crate::row::Row;
use crate::table::Table;
use crate::value::{IntoValue, Value};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Fields read by [`get_times`] when none are given
pub const DEFAULT_TIME_FIELDS: [&str; 2] = ["created_at", "updated_at"];

fn filter_to_patch(filter: &Filter) -> DbxResult<Patch> {
    let mut patch = Patch::new();
    for (column, condition) in filter.iter() {
        match condition {
            Condition::Equals(value) => patch.set(column.clone(), value.clone()),
            Condition::IsNull => patch.set(column.clone(), Value::Null),
            Condition::IsNotNull => {
                return Err(DbxError::InvalidOperation {
                    message: format!("cannot seed '{column}' from a not-null condition"),
                    context: "seed_row()".to_string(),
                });
            }
        }
    }
    Ok(patch)
}

/// Find the row matching `filter`, or insert it; then apply `extra`.
///
/// Returns the id of the found or inserted row.
pub fn seed_row(table: &Table, filter: &Filter, extra: Patch) -> DbxResult<i64> {
    if let Some(row) = table.find(filter)? {
        if !extra.is_empty() {
            row.update(extra)?;
        }
        return Ok(row.id());
    }
    let mut patch = filter_to_patch(filter)?;
    patch.merge(extra);
    table.push(patch)
}

/// Update the row whose `key_column` equals the patch's value for it, or
/// insert the patch as a new row.
pub fn upsert(table: &Table, key_column: &str, patch: Patch) -> DbxResult<i64> {
    let key = patch
        .get(key_column)
        .cloned()
        .ok_or_else(|| DbxError::InvalidOperation {
            message: format!("payload has no value for key column '{key_column}'"),
            context: format!("upsert() on table '{}'", table.name()),
        })?;

    match table.find(&Filter::new().eq(key_column, key))? {
        Some(row) => {
            row.update(patch)?;
            Ok(row.id())
        }
        None => table.push(patch),
    }
}

/// Id of the row where `column = value`, inserting `{ column: value }` if absent.
pub fn get_id(table: &Table, column: &str, value: impl IntoValue) -> DbxResult<i64> {
    let value = value.into_value();
    match table.find(&Filter::new().eq(column, value.clone()))? {
        Some(row) => Ok(row.id()),
        None => table.push(Patch::new().with(column, value)),
    }
}

/// Timestamp columns of a row, parsed as UTC. `fields` defaults to
/// [`DEFAULT_TIME_FIELDS`].
pub fn get_times(
    row: &Row,
    fields: Option<&[&str]>,
) -> DbxResult<BTreeMap<String, Option<DateTime<Utc>>>> {
    fields
        .unwrap_or(&DEFAULT_TIME_FIELDS)
        .iter()
        .map(|&field| Ok((field.to_string(), row.get_as::<DateTime<Utc>>(field)?)))
        .collect()
}
