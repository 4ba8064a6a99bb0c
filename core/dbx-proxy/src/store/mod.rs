//! Store interface
//!
//! The engine talks to storage only through [`Store`]: compile a statement,
//! execute it, query it. [`SqliteStore`] is the SQLite implementation.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::DbxResult;
use crate::record::Record;
use crate::statement::PreparedStatement;
use crate::value::ScalarValue;

/// Result of a data-modifying statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    /// Rows affected
    pub changes: usize,
    /// Row id assigned by an `INSERT`, if any
    pub last_insert_id: Option<i64>,
}

/// Result of a query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ScalarValue>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// First column of the first row
    pub fn first_value(&self) -> Option<&ScalarValue> {
        self.rows.first().and_then(|row| row.first())
    }

    /// First column of the first row as an integer (`count(*)`, `max(id)`)
    pub fn scalar_i64(&self) -> Option<i64> {
        self.first_value().and_then(ScalarValue::as_i64)
    }

    /// Integer values of the first column, skipping non-integers
    pub fn ids(&self) -> Vec<i64> {
        self.rows
            .iter()
            .filter_map(|row| row.first().and_then(ScalarValue::as_i64))
            .collect()
    }

    pub fn into_records(self) -> Vec<Record> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| Record::from_columns(&columns, values))
            .collect()
    }

    pub fn into_first_record(self) -> Option<Record> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .next()
            .map(|values| Record::from_columns(&columns, values))
    }
}

/// Synchronous statement store.
///
/// Implementations must be shareable across threads; the engine never holds
/// a store-side statement between calls.
pub trait Store: Send + Sync {
    /// Compile `sql`, reporting its parameter count and result columns.
    fn prepare(&self, sql: &str) -> DbxResult<PreparedStatement>;

    /// Run a data-modifying statement.
    fn execute(&self, stmt: &PreparedStatement, params: &[ScalarValue]) -> DbxResult<ExecOutcome>;

    /// Run a query and collect every row.
    fn query(&self, stmt: &PreparedStatement, params: &[ScalarValue]) -> DbxResult<QueryResult>;

    /// Run one or more `;`-separated statements without parameters (schema setup).
    fn execute_batch(&self, sql: &str) -> DbxResult<()>;

    /// `CREATE TABLE` text of `table`, or `None` when the table does not exist.
    fn table_ddl(&self, table: &str) -> DbxResult<Option<String>>;

    /// Restart the autoincrement sequence of `table`. No-op without one.
    fn reset_sequence(&self, table: &str) -> DbxResult<()>;
}
