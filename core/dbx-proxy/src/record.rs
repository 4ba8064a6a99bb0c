//! Records and patches: whole-row read results and write payloads

use crate::error::DbxResult;
use crate::schema::TableDef;
use crate::value::{FromScalar, IntoValue, ScalarValue, Value};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// A fully materialized row: column → stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, ScalarValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_columns(columns: &[String], values: Vec<ScalarValue>) -> Self {
        Self {
            fields: columns.iter().cloned().zip(values).collect(),
        }
    }

    /// Row id, when the projection included it
    pub fn id(&self) -> Option<i64> {
        self.fields.get("id").and_then(ScalarValue::as_i64)
    }

    pub fn get(&self, column: &str) -> Option<&ScalarValue> {
        self.fields.get(column)
    }

    /// Typed read; a missing column reads as `NULL`
    pub fn get_as<T: FromScalar>(&self, column: &str) -> DbxResult<T> {
        T::from_scalar(self.fields.get(column).unwrap_or(&ScalarValue::Null))
    }

    pub fn insert(&mut self, column: impl Into<String>, value: ScalarValue) {
        self.fields.insert(column.into(), value);
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ScalarValue> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, ScalarValue> {
        self.fields
    }
}

impl<K: Into<String>> FromIterator<(K, ScalarValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, ScalarValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A partial row to write. Field names may be plain columns or relation fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    fields: BTreeMap<String, Value>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment
    pub fn with(mut self, field: impl Into<String>, value: impl IntoValue) -> Self {
        self.fields.insert(field.into(), value.into_value());
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl IntoValue) {
        self.fields.insert(field.into(), value.into_value());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Copy every field of `other` over this patch
    pub fn merge(&mut self, other: Patch) {
        self.fields.extend(other.fields);
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl IntoIterator for Patch {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K: Into<String>, V: IntoValue> FromIterator<(K, V)> for Patch {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into_value()))
                .collect(),
        }
    }
}

impl From<Record> for Patch {
    fn from(record: Record) -> Self {
        record.fields.into_iter().collect()
    }
}

/// Build a typed value from a materialized row.
pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> DbxResult<Self>;
}

impl FromRecord for Record {
    fn from_record(record: &Record) -> DbxResult<Self> {
        Ok(record.clone())
    }
}

/// Static table description, usually generated by `#[derive(Table)]`.
pub trait TableSchema {
    const TABLE_NAME: &'static str;

    /// Persisted columns, excluding the implicit `id` primary key
    fn columns() -> Vec<&'static str>;

    fn table_def() -> TableDef {
        TableDef::new(Self::TABLE_NAME).columns(Self::columns())
    }
}
