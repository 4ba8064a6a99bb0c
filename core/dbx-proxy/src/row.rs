//! Row handles
//!
//! A [`Row`] is an identity (table + id), not a snapshot. Reads go to the
//! store on every call and writes are single-statement updates, so a handle
//! never disagrees with storage.

use crate::error::{DbxError, DbxResult};
use crate::record::{FromRecord, Patch, Record};
use crate::row_cache::RowSlot;
use crate::table::Table;
use crate::value::{FromScalar, IntoValue, RowRef, ScalarValue, Value};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Row {
    slot: Arc<RowSlot>,
    table: Table,
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("table", &self.table.name())
            .field("id", &self.slot.id())
            .finish()
    }
}

impl Row {
    pub(crate) fn new(slot: Arc<RowSlot>, table: Table) -> Self {
        Self { slot, table }
    }

    pub fn id(&self) -> i64 {
        self.slot.id()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// True when both handles are the same cached instance.
    pub fn same_handle(a: &Row, b: &Row) -> bool {
        Arc::ptr_eq(&a.slot, &b.slot)
    }

    pub fn to_ref(&self) -> RowRef {
        RowRef {
            table: self.table.name().to_string(),
            id: self.id(),
        }
    }

    /// Current value of a column; `None` when the row no longer exists.
    pub fn get(&self, field: &str) -> DbxResult<Option<ScalarValue>> {
        if field != "id" && !self.table.has_column(field) {
            if self.table.relation(field).is_some() {
                return Err(DbxError::InvalidOperation {
                    message: format!("'{field}' is a relation, use related()"),
                    context: format!("table '{}'", self.table.name()),
                });
            }
            return Err(DbxError::unknown_column(self.table.name(), field));
        }
        self.table.select_column(self.id(), field)
    }

    /// Typed read; `None` when the row is gone or the column is `NULL`.
    pub fn get_as<T: FromScalar>(&self, field: &str) -> DbxResult<Option<T>> {
        match self.get(field)? {
            None | Some(ScalarValue::Null) => Ok(None),
            Some(value) => Ok(Some(T::from_scalar(&value)?)),
        }
    }

    /// Assign one field. Relation fields write the referenced id into their
    /// foreign key column.
    pub fn set(&self, field: &str, value: impl IntoValue) -> DbxResult<()> {
        if field == "id" {
            return Err(DbxError::ImmutableId {
                table: self.table.name().to_string(),
            });
        }
        self.table
            .update(self.id(), Patch::new().with(field, value))?;
        Ok(())
    }

    /// Partial update of this row; returns the number of rows changed (0 or 1).
    pub fn update(&self, patch: Patch) -> DbxResult<usize> {
        self.table.update(self.id(), patch)
    }

    /// Snapshot of every column; `None` when the row no longer exists.
    pub fn materialize(&self) -> DbxResult<Option<Record>> {
        self.table.select_row(self.id())
    }

    pub fn materialize_as<T: FromRecord>(&self) -> DbxResult<Option<T>> {
        self.table.get_as(self.id())
    }

    /// Follow a relation field to the referenced row.
    ///
    /// Returns `None` when the foreign key is `NULL`. The target row is not
    /// checked for existence.
    pub fn related(&self, field: &str) -> DbxResult<Option<Row>> {
        let relation = self
            .table
            .relation(field)
            .ok_or_else(|| DbxError::unknown_column(self.table.name(), field))?;
        match self.table.select_column(self.id(), &relation.foreign_key)? {
            None | Some(ScalarValue::Null) => Ok(None),
            Some(ScalarValue::Integer(id)) => {
                let target = self.table.sibling(&relation.target)?;
                Ok(Some(target.row_handle(id)))
            }
            Some(other) => Err(DbxError::type_mismatch("integer id", other.type_name())),
        }
    }

    /// Point a relation field at `target`, or clear it with `None`.
    pub fn set_related(&self, field: &str, target: Option<&Row>) -> DbxResult<()> {
        if self.table.relation(field).is_none() {
            return Err(DbxError::unknown_column(self.table.name(), field));
        }
        self.set(field, target)
    }
}

impl IntoValue for &Row {
    fn into_value(self) -> Value {
        Value::Row(self.to_ref())
    }
}

impl IntoValue for Row {
    fn into_value(self) -> Value {
        Value::Row(self.to_ref())
    }
}
