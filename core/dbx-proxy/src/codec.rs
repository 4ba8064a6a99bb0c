//! Value Codec: native values ↔ SQLite storage representation
//!
//! | native              | stored                               |
//! |---------------------|--------------------------------------|
//! | `bool`              | `INTEGER` 0 / 1 (read back as 0 / 1) |
//! | `DateTime<Utc>`     | `TEXT` `YYYY-MM-DD HH:MM:SS` (UTC)   |
//! | structured value    | `TEXT` JSON                          |
//! | row reference       | `INTEGER` id of the referenced row   |
//!
//! Booleans are not re-coerced on read: a consumer that wrote
//! `true` reads back `Integer(1)`. Callers that want a `bool` ask for it via
//! [`FromScalar`](crate::value::FromScalar).

use crate::error::{DbxError, DbxResult};
use crate::value::{ScalarValue, Value};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Timestamp layout shared with SQLite's `CURRENT_TIMESTAMP`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Encode a write-side value into its storage form.
pub fn to_storage(value: Value) -> DbxResult<ScalarValue> {
    Ok(match value {
        Value::Null => ScalarValue::Null,
        Value::Bool(v) => ScalarValue::Integer(i64::from(v)),
        Value::Integer(v) => ScalarValue::Integer(v),
        Value::Real(v) => ScalarValue::Real(v),
        Value::Text(v) => ScalarValue::Text(v),
        Value::Blob(v) => ScalarValue::Blob(v),
        Value::Timestamp(v) => ScalarValue::Text(to_sqlite_timestamp(&v)),
        Value::Json(v) => ScalarValue::Text(serde_json::to_string(&v)?),
        Value::Row(r) => ScalarValue::Integer(r.id),
    })
}

/// Format a UTC instant the way SQLite's `CURRENT_TIMESTAMP` does.
pub fn to_sqlite_timestamp(date: &DateTime<Utc>) -> String {
    date.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp back into a UTC instant.
///
/// Accepts the canonical `YYYY-MM-DD HH:MM:SS` form, the same with fractional
/// seconds, and RFC 3339 text written by other tools.
pub fn from_sqlite_timestamp(text: &str) -> DbxResult<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT) {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DbxError::type_mismatch("timestamp 'YYYY-MM-DD HH:MM:SS'", text))
}

/// Serialize a structured value into a JSON text column.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> DbxResult<ScalarValue> {
    Ok(ScalarValue::Text(serde_json::to_string(value)?))
}

/// Deserialize a JSON column. Absent, `NULL` and empty storage decode to `None`.
pub fn decode_json<T: DeserializeOwned>(stored: Option<&ScalarValue>) -> DbxResult<Option<T>> {
    match stored {
        None | Some(ScalarValue::Null) => Ok(None),
        Some(ScalarValue::Text(text)) if text.is_empty() => Ok(None),
        Some(ScalarValue::Text(text)) => Ok(Some(serde_json::from_str(text)?)),
        Some(ScalarValue::Blob(bytes)) if bytes.is_empty() => Ok(None),
        Some(ScalarValue::Blob(bytes)) => Ok(Some(serde_json::from_slice(bytes)?)),
        Some(ScalarValue::Integer(v)) => Ok(Some(serde_json::from_value((*v).into())?)),
        Some(ScalarValue::Real(v)) => Ok(Some(serde_json::from_value((*v).into())?)),
    }
}
