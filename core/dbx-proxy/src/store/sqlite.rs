//! SQLite store backed by a single `rusqlite::Connection`

use super::{ExecOutcome, QueryResult, Store};
use crate::error::DbxResult;
use crate::statement::PreparedStatement;
use crate::value::ScalarValue;
use parking_lot::Mutex;
use rusqlite::types::{ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, OptionalExtension, ToSql, params_from_iter};
use std::path::Path;
use tracing::debug;

/// Default capacity of rusqlite's compiled-statement LRU.
///
/// One LRU per connection, shared by every table of the store. Workloads with
/// more live statement shapes than this should raise it through
/// [`SqliteStore::with_statement_capacity`].
pub const DEFAULT_STATEMENT_CAPACITY: usize = 1024;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> DbxResult<Self> {
        let path = path.as_ref();
        debug!(target: "dbx_proxy", path = %path.display(), "opening sqlite store");
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn open_in_memory() -> DbxResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        conn.set_prepared_statement_cache_capacity(DEFAULT_STATEMENT_CAPACITY);
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Resize the compiled-statement LRU held by the connection.
    ///
    /// Must exceed the number of live statement shapes, or shapes evicted here
    /// are recompiled on their next use.
    pub fn with_statement_capacity(self, capacity: usize) -> Self {
        self.conn
            .lock()
            .set_prepared_statement_cache_capacity(capacity);
        self
    }

    /// Run `f` with exclusive access to the connection.
    ///
    /// # Deadlock
    ///
    /// The connection mutex is not reentrant. Calling back into this store
    /// from `f`, directly or through a `Table`, `Schema` or key-value table
    /// built on it, blocks forever.
    pub fn with_connection<R>(&self, f: impl FnOnce(&Connection) -> R) -> R {
        f(&self.conn.lock())
    }
}

impl ToSql for ScalarValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            ScalarValue::Null => ValueRef::Null,
            ScalarValue::Integer(v) => ValueRef::Integer(*v),
            ScalarValue::Real(v) => ValueRef::Real(*v),
            ScalarValue::Text(v) => ValueRef::Text(v.as_bytes()),
            ScalarValue::Blob(v) => ValueRef::Blob(v),
        }))
    }
}

/// TEXT that is not valid UTF-8 is an error, never a lossy copy.
fn from_value_ref(idx: usize, value: ValueRef<'_>) -> rusqlite::Result<ScalarValue> {
    Ok(match value {
        ValueRef::Null => ScalarValue::Null,
        ValueRef::Integer(v) => ScalarValue::Integer(v),
        ValueRef::Real(v) => ScalarValue::Real(v),
        ValueRef::Text(v) => {
            let text = std::str::from_utf8(v).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })?;
            ScalarValue::Text(text.to_string())
        }
        ValueRef::Blob(v) => ScalarValue::Blob(v.to_vec()),
    })
}

impl Store for SqliteStore {
    fn prepare(&self, sql: &str) -> DbxResult<PreparedStatement> {
        let conn = self.conn.lock();
        let stmt = conn.prepare_cached(sql)?;
        let columns = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok(PreparedStatement::new(
            sql.to_string(),
            stmt.parameter_count(),
            columns,
        ))
    }

    fn execute(&self, stmt: &PreparedStatement, params: &[ScalarValue]) -> DbxResult<ExecOutcome> {
        stmt.validate_params(params)?;
        let conn = self.conn.lock();
        let changes = conn
            .prepare_cached(stmt.sql())?
            .execute(params_from_iter(params.iter()))?;
        let is_insert = stmt
            .sql()
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("INSERT"));
        Ok(ExecOutcome {
            changes,
            last_insert_id: (is_insert && changes > 0).then(|| conn.last_insert_rowid()),
        })
    }

    fn query(&self, stmt: &PreparedStatement, params: &[ScalarValue]) -> DbxResult<QueryResult> {
        stmt.validate_params(params)?;
        let conn = self.conn.lock();
        let mut cached = conn.prepare_cached(stmt.sql())?;
        let columns: Vec<String> = cached
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let width = columns.len();

        let mut rows = cached.query(params_from_iter(params.iter()))?;
        let mut result_rows = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(from_value_ref(idx, row.get_ref(idx)?)?);
            }
            result_rows.push(values);
        }

        Ok(QueryResult {
            columns,
            rows: result_rows,
        })
    }

    fn execute_batch(&self, sql: &str) -> DbxResult<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    fn table_ddl(&self, table: &str) -> DbxResult<Option<String>> {
        let conn = self.conn.lock();
        let ddl = conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(ddl.flatten())
    }

    fn reset_sequence(&self, table: &str) -> DbxResult<()> {
        let conn = self.conn.lock();
        let has_sequence: bool = conn.query_row(
            "SELECT count(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'",
            [],
            |row| row.get(0),
        )?;
        if has_sequence {
            conn.execute("UPDATE sqlite_sequence SET seq = 0 WHERE name = ?1", [table])?;
        }
        Ok(())
    }
}
