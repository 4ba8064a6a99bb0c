//! Value types: storage-side [`ScalarValue`] and write-side [`Value`]
//!
//! Writes accept native Rust values through [`IntoValue`]; the codec folds them into
//! the storage representation. Reads hand back [`ScalarValue`] exactly as SQLite
//! stored it, with [`FromScalar`] as the explicit, opt-in typed conversion.

use crate::codec;
use crate::error::{DbxError, DbxResult};
use chrono::{DateTime, Utc};
use std::fmt;

/// A value as persisted by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Storage class name, as SQLite reports it from `typeof()`
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarValue::Null => "null",
            ScalarValue::Integer(_) => "integer",
            ScalarValue::Real(_) => "real",
            ScalarValue::Text(_) => "text",
            ScalarValue::Blob(_) => "blob",
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("NULL"),
            ScalarValue::Integer(v) => write!(f, "{v}"),
            ScalarValue::Real(v) => write!(f, "{v}"),
            ScalarValue::Text(v) => f.write_str(v),
            ScalarValue::Blob(v) => write!(f, "<blob {} bytes>", v.len()),
        }
    }
}

/// Reference to a row of another table, used when assigning relation fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRef {
    pub table: String,
    pub id: i64,
}

/// A native value on the write path, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    /// Stored as `YYYY-MM-DD HH:MM:SS` (UTC)
    Timestamp(DateTime<Utc>),
    /// Stored as JSON text
    Json(serde_json::Value),
    /// Stored as the referenced id when folded into a foreign-key column
    Row(RowRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Conversion into a write-side [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for ScalarValue {
    fn into_value(self) -> Value {
        match self {
            ScalarValue::Null => Value::Null,
            ScalarValue::Integer(v) => Value::Integer(v),
            ScalarValue::Real(v) => Value::Real(v),
            ScalarValue::Text(v) => Value::Text(v),
            ScalarValue::Blob(v) => Value::Blob(v),
        }
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Integer(self as i64)
    }
}

impl IntoValue for u32 {
    fn into_value(self) -> Value {
        Value::Integer(self as i64)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Real(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl IntoValue for &String {
    fn into_value(self) -> Value {
        Value::Text(self.clone())
    }
}

impl IntoValue for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Blob(self)
    }
}

impl IntoValue for &[u8] {
    fn into_value(self) -> Value {
        Value::Blob(self.to_vec())
    }
}

impl IntoValue for DateTime<Utc> {
    fn into_value(self) -> Value {
        Value::Timestamp(self)
    }
}

impl IntoValue for serde_json::Value {
    fn into_value(self) -> Value {
        Value::Json(self)
    }
}

impl IntoValue for RowRef {
    fn into_value(self) -> Value {
        Value::Row(self)
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

/// Typed conversion out of a stored [`ScalarValue`].
///
/// Booleans are read back as integers by default; `bool: FromScalar` is the
/// explicit opt-in that turns the stored 0/1 into `false`/`true`.
pub trait FromScalar: Sized {
    fn from_scalar(value: &ScalarValue) -> DbxResult<Self>;
}

impl FromScalar for ScalarValue {
    fn from_scalar(value: &ScalarValue) -> DbxResult<Self> {
        Ok(value.clone())
    }
}

impl FromScalar for i64 {
    fn from_scalar(value: &ScalarValue) -> DbxResult<Self> {
        match value {
            ScalarValue::Integer(v) => Ok(*v),
            other => Err(DbxError::type_mismatch("integer", other.type_name())),
        }
    }
}

impl FromScalar for i32 {
    fn from_scalar(value: &ScalarValue) -> DbxResult<Self> {
        let wide = i64::from_scalar(value)?;
        i32::try_from(wide).map_err(|_| DbxError::type_mismatch("i32", wide.to_string()))
    }
}

impl FromScalar for f64 {
    fn from_scalar(value: &ScalarValue) -> DbxResult<Self> {
        match value {
            ScalarValue::Real(v) => Ok(*v),
            ScalarValue::Integer(v) => Ok(*v as f64),
            other => Err(DbxError::type_mismatch("real", other.type_name())),
        }
    }
}

impl FromScalar for String {
    fn from_scalar(value: &ScalarValue) -> DbxResult<Self> {
        match value {
            ScalarValue::Text(v) => Ok(v.clone()),
            other => Err(DbxError::type_mismatch("text", other.type_name())),
        }
    }
}

impl FromScalar for bool {
    fn from_scalar(value: &ScalarValue) -> DbxResult<Self> {
        match value {
            ScalarValue::Integer(0) => Ok(false),
            ScalarValue::Integer(1) => Ok(true),
            other => Err(DbxError::type_mismatch("integer 0/1", other.to_string())),
        }
    }
}

impl FromScalar for Vec<u8> {
    fn from_scalar(value: &ScalarValue) -> DbxResult<Self> {
        match value {
            ScalarValue::Blob(v) => Ok(v.clone()),
            other => Err(DbxError::type_mismatch("blob", other.type_name())),
        }
    }
}

impl FromScalar for DateTime<Utc> {
    fn from_scalar(value: &ScalarValue) -> DbxResult<Self> {
        match value {
            ScalarValue::Text(v) => codec::from_sqlite_timestamp(v),
            other => Err(DbxError::type_mismatch("timestamp text", other.type_name())),
        }
    }
}

impl FromScalar for serde_json::Value {
    fn from_scalar(value: &ScalarValue) -> DbxResult<Self> {
        codec::decode_json(Some(value))?
            .ok_or_else(|| DbxError::type_mismatch("json", value.type_name()))
    }
}

impl<T: FromScalar> FromScalar for Option<T> {
    fn from_scalar(value: &ScalarValue) -> DbxResult<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            Ok(Some(T::from_scalar(value)?))
        }
    }
}
