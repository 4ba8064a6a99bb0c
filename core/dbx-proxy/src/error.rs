//! Error types for DBX Proxy.
//!
//! All public APIs return `DbxResult<T>`: no panics in library code.
//! A row or match that does not exist is `None`, never an error.

use thiserror::Error;

/// Unified error type for all proxy operations.
#[derive(Debug, Error)]
pub enum DbxError {
    /// SQLite reported an error (constraint violation, I/O, busy/locked, ...)
    #[error("sqlite error: {source}")]
    Sqlite {
        #[from]
        source: rusqlite::Error,
    },

    /// Storage layer error not raised by SQLite itself
    #[error("storage error: {0}")]
    Storage(String),

    /// Standard I/O error
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Schema declaration or validation error
    #[error("schema error: {0}")]
    Schema(String),

    /// Requested table is not declared (or does not exist in the store)
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// Field name is neither a declared column nor a relation of the table
    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// Predicate operation called with an empty filter
    #[error("{operation}() expects non-empty filter")]
    EmptyFilter { operation: &'static str },

    /// Attempt to assign the id of an existing row
    #[error("cannot update id of table '{table}'")]
    ImmutableId { table: String },

    /// Type mismatch between expected and actual values
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// DDL parsing error
    #[error("SQL parse error: {message}\nSQL: {sql}")]
    SqlParse { message: String, sql: String },

    /// Invalid operation
    #[error("invalid operation: {message}\nContext: {context}")]
    InvalidOperation { message: String, context: String },

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for all proxy operations.
pub type DbxResult<T> = Result<T, DbxError>;

impl From<serde_json::Error> for DbxError {
    fn from(err: serde_json::Error) -> Self {
        DbxError::Serialization(err.to_string())
    }
}

impl DbxError {
    pub(crate) fn unknown_column(table: &str, column: &str) -> Self {
        DbxError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    pub(crate) fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        DbxError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
