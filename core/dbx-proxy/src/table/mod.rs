//! Table Virtualization Engine
//!
//! A [`Table`] presents one SQL table as an ordered, id-indexed collection.
//! Every operation picks a statement shape, fetches the compiled statement
//! from the table's [`StatementCache`] and binds values positionally. Row
//! handles come from the table's [`RowCache`], so a row looked up twice is
//! the same [`Row`] until the cache is cleared.

pub mod iter;
pub mod query;

pub use iter::TableIter;
pub use query::UpdateTarget;

use crate::config::ProxyConfig;
use crate::error::{DbxError, DbxResult};
use crate::record::{FromRecord, Patch, Record};
use crate::relation;
use crate::row::Row;
use crate::row_cache::RowCache;
use crate::schema::{Relation, SchemaInner};
use crate::statement::sql::{self, column_set_shape};
use crate::statement::{CacheStats, StatementCache, StatementKind};
use crate::store::{ExecOutcome, QueryResult, Store};
use crate::value::ScalarValue;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

pub(crate) struct TableCore {
    name: String,
    /// Declared columns, excluding `id`
    columns: Vec<String>,
    relations: Vec<Relation>,
    statements: StatementCache,
    rows: RowCache,
    store: Arc<dyn Store>,
    schema: Weak<SchemaInner>,
    config: ProxyConfig,
    /// Serializes the existence check and write of `set`
    write_lock: Mutex<()>,
}

/// Handle to one virtualized table. Cloning is cheap and shares all caches.
#[derive(Clone)]
pub struct Table {
    core: Arc<TableCore>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.core.name)
            .field("columns", &self.core.columns)
            .field("relations", &self.core.relations)
            .finish()
    }
}

impl Table {
    pub(crate) fn new(
        name: String,
        columns: Vec<String>,
        relations: Vec<Relation>,
        store: Arc<dyn Store>,
        schema: Weak<SchemaInner>,
        config: ProxyConfig,
    ) -> Self {
        let statements = StatementCache::new(name.clone());
        let rows = RowCache::new(name.clone(), &config.row_cache);
        Self {
            core: Arc::new(TableCore {
                name,
                columns,
                relations,
                statements,
                rows,
                store,
                schema,
                config,
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Declared columns, excluding `id`
    pub fn columns(&self) -> &[String] {
        &self.core.columns
    }

    pub fn relations(&self) -> &[Relation] {
        &self.core.relations
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.core.config
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.core.columns.iter().any(|c| c == column)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.core.relations.iter().find(|r| r.name == name)
    }

    /// True when both handles point at the same table instance.
    pub fn same_table(a: &Table, b: &Table) -> bool {
        Arc::ptr_eq(&a.core, &b.core)
    }

    // ===== Element access =====

    /// Row handle for `id`, or `None` when no such row exists.
    pub fn get(&self, id: i64) -> DbxResult<Option<Row>> {
        if self.contains(id)? {
            Ok(Some(self.row_handle(id)))
        } else {
            Ok(None)
        }
    }

    /// Row ids are strictly positive; `id <= 0` is never present.
    pub fn contains(&self, id: i64) -> DbxResult<bool> {
        if id <= 0 {
            return Ok(false);
        }
        let name = self.name();
        let result = self.run_query(StatementKind::Exists, "", || sql::exists(name), &[
            ScalarValue::Integer(id),
        ])?;
        Ok(result.scalar_i64().unwrap_or(0) > 0)
    }

    /// Write `patch` at `id`: a partial update when the row exists, otherwise
    /// an insert that keeps `id`.
    pub fn set(&self, id: i64, patch: Patch) -> DbxResult<()> {
        if id <= 0 {
            return Err(DbxError::InvalidOperation {
                message: format!("row id must be positive, got {id}"),
                context: format!("set() on table '{}'", self.name()),
            });
        }
        let _guard = self.core.write_lock.lock();
        if self.contains(id)? {
            self.update(id, patch)?;
            return Ok(());
        }

        if let Some(value) = patch.get("id") {
            relation::check_same_id(self.name(), value, id)?;
        }
        let mut values = relation::fold_patch(self, patch)?;
        values.insert("id".to_string(), ScalarValue::Integer(id));
        trace!(target: "dbx_proxy", table = %self.name(), id, "insert at id");
        self.insert_values(StatementKind::InsertWithId, values)?;
        Ok(())
    }

    /// Delete the row at `id`; deleting an absent row is a no-op.
    pub fn delete(&self, id: i64) -> DbxResult<usize> {
        let name = self.name();
        let outcome = self.run_execute(
            StatementKind::DeleteById,
            "",
            || sql::delete_by_id(name),
            &[ScalarValue::Integer(id)],
        )?;
        Ok(outcome.changes)
    }

    // ===== Length =====

    /// Number of rows (not the highest id)
    pub fn len(&self) -> DbxResult<usize> {
        let name = self.name();
        let result = self.run_query(StatementKind::CountAll, "", || sql::count_all(name), &[])?;
        Ok(result.scalar_i64().unwrap_or(0).max(0) as usize)
    }

    pub fn is_empty(&self) -> DbxResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Delete every row whose id exceeds `n`; `n <= 0` truncates the table.
    pub fn set_len(&self, n: i64) -> DbxResult<usize> {
        if n <= 0 {
            return self.truncate();
        }
        let name = self.name();
        let outcome = self.run_execute(
            StatementKind::DeleteAbove,
            "",
            || sql::delete_above(name),
            &[ScalarValue::Integer(n)],
        )?;
        Ok(outcome.changes)
    }

    /// Highest id in the table
    pub fn max_id(&self) -> DbxResult<Option<i64>> {
        let name = self.name();
        let result = self.run_query(StatementKind::MaxId, "", || sql::max_id(name), &[])?;
        Ok(result.scalar_i64())
    }

    // ===== Append =====

    /// Insert a row and return its id.
    pub fn push(&self, patch: Patch) -> DbxResult<i64> {
        let values = relation::fold_patch(self, patch)?;
        let outcome = if values.is_empty() {
            let name = self.name();
            self.run_execute(StatementKind::InsertEmpty, "", || sql::insert_empty(name), &[])?
        } else {
            self.insert_values(StatementKind::Insert, values)?
        };
        match outcome.last_insert_id {
            Some(id) => Ok(id),
            None => self.max_id()?.ok_or_else(|| {
                DbxError::Storage(format!("insert into '{}' reported no row id", self.name()))
            }),
        }
    }

    /// Insert every patch in order; returns the last inserted id, or the
    /// current highest id when nothing was inserted.
    pub fn extend(&self, patches: impl IntoIterator<Item = Patch>) -> DbxResult<Option<i64>> {
        let mut last_id = None;
        for patch in patches {
            last_id = Some(self.push(patch)?);
        }
        match last_id {
            Some(id) => Ok(Some(id)),
            None => self.max_id(),
        }
    }

    // ===== Enumeration =====

    /// Lazy iteration in ascending id order. Each call starts from the beginning.
    pub fn iter(&self) -> TableIter {
        TableIter::new(self.clone(), self.core.config.batch_size())
    }

    pub fn ids(&self) -> DbxResult<Vec<i64>> {
        let name = self.name();
        let result = self.run_query(
            StatementKind::IdRange,
            "all",
            || sql::id_range(name, false, false),
            &[],
        )?;
        Ok(result.ids())
    }

    /// Rows whose id falls in `range`, ascending.
    pub fn slice(&self, range: impl RangeBounds<i64>) -> DbxResult<Vec<Row>> {
        let start = match range.start_bound() {
            Bound::Included(&s) => Some(s),
            Bound::Excluded(&s) => Some(s.saturating_add(1)),
            Bound::Unbounded => None,
        };
        let end = match range.end_bound() {
            Bound::Excluded(&e) => Some(e),
            Bound::Included(&e) => Some(e.saturating_add(1)),
            Bound::Unbounded => None,
        };

        let (shape, params) = match (start, end) {
            (None, None) => ("all", vec![]),
            (Some(s), None) => ("start", vec![ScalarValue::Integer(s)]),
            (None, Some(e)) => ("end", vec![ScalarValue::Integer(e)]),
            (Some(s), Some(e)) => (
                "start_end",
                vec![ScalarValue::Integer(s), ScalarValue::Integer(e)],
            ),
        };
        let name = self.name();
        let result = self.run_query(
            StatementKind::IdRange,
            shape,
            || sql::id_range(name, start.is_some(), end.is_some()),
            &params,
        )?;
        Ok(result.ids().into_iter().map(|id| self.row_handle(id)).collect())
    }

    // ===== Bulk =====

    /// Delete every row and restart the id sequence.
    pub fn truncate(&self) -> DbxResult<usize> {
        let name = self.name();
        let outcome = self.run_execute(StatementKind::DeleteAll, "", || sql::delete_all(name), &[])?;
        self.core.store.reset_sequence(name)?;
        debug!(target: "dbx_proxy", table = %name, deleted = outcome.changes, "table truncated");
        Ok(outcome.changes)
    }

    /// Every row as a plain record, ascending by id
    pub fn materialize_all(&self) -> DbxResult<Vec<Record>> {
        let name = self.name();
        let result = self.run_query(StatementKind::SelectAll, "", || sql::select_all(name), &[])?;
        Ok(result.into_records())
    }

    pub fn materialize_as<T: FromRecord>(&self) -> DbxResult<Vec<T>> {
        self.materialize_all()?
            .iter()
            .map(T::from_record)
            .collect()
    }

    /// Typed snapshot of the row at `id`
    pub fn get_as<T: FromRecord>(&self, id: i64) -> DbxResult<Option<T>> {
        self.select_row(id)?
            .as_ref()
            .map(T::from_record)
            .transpose()
    }

    // ===== Caches =====

    /// Forget every cached row handle of this table. Returns how many were dropped.
    pub fn clear_cache(&self) -> usize {
        let dropped = self.core.rows.clear_all();
        debug!(target: "dbx_proxy", table = %self.name(), dropped, "row cache cleared");
        dropped
    }

    /// Forget the cached handle of one row. Handles already given out keep
    /// working; the next `get(id)` builds a fresh one.
    pub fn invalidate(&self, id: i64) -> bool {
        let dropped = self.core.rows.invalidate(id);
        trace!(target: "dbx_proxy", table = %self.name(), id, dropped, "row handle invalidated");
        dropped
    }

    pub fn cache_len(&self) -> usize {
        self.core.rows.len()
    }

    pub fn row_cache_stats(&self) -> CacheStats {
        self.core.rows.stats()
    }

    pub fn statement_stats(&self) -> CacheStats {
        self.core.statements.stats()
    }

    /// Number of distinct statement shapes compiled so far.
    ///
    /// The compiled SQLite statements themselves sit in the connection's
    /// LRU, which every table on the same store shares. Past
    /// [`SqliteStore::with_statement_capacity`](crate::store::SqliteStore::with_statement_capacity)
    /// live shapes, the oldest ones are recompiled on their next use.
    pub fn statement_count(&self) -> usize {
        self.core.statements.len()
    }

    pub fn clear_statements(&self) {
        self.core.statements.clear();
    }

    // ===== Internals shared with row / relation / query =====

    /// Canonical handle for `id`, without an existence check
    pub(crate) fn row_handle(&self, id: i64) -> Row {
        Row::new(self.core.rows.get_or_create(id), self.clone())
    }

    pub(crate) fn run_query(
        &self,
        kind: StatementKind,
        shape: &str,
        synthesize: impl FnOnce() -> String,
        params: &[ScalarValue],
    ) -> DbxResult<QueryResult> {
        let stmt = self
            .core
            .statements
            .get_or_create(self.core.store.as_ref(), kind, shape, synthesize)?;
        self.core.store.query(&stmt, params)
    }

    pub(crate) fn run_execute(
        &self,
        kind: StatementKind,
        shape: &str,
        synthesize: impl FnOnce() -> String,
        params: &[ScalarValue],
    ) -> DbxResult<ExecOutcome> {
        let stmt = self
            .core
            .statements
            .get_or_create(self.core.store.as_ref(), kind, shape, synthesize)?;
        self.core.store.execute(&stmt, params)
    }

    pub(crate) fn select_column(&self, id: i64, column: &str) -> DbxResult<Option<ScalarValue>> {
        let name = self.name();
        let result = self.run_query(
            StatementKind::SelectColumn,
            &sql::quote_ident(column),
            || sql::select_column(name, column),
            &[ScalarValue::Integer(id)],
        )?;
        Ok(result.rows.into_iter().next().and_then(|row| row.into_iter().next()))
    }

    pub(crate) fn select_row(&self, id: i64) -> DbxResult<Option<Record>> {
        let name = self.name();
        let result = self.run_query(
            StatementKind::SelectRow,
            "",
            || sql::select_row(name),
            &[ScalarValue::Integer(id)],
        )?;
        Ok(result.into_first_record())
    }

    /// Another table of the same schema
    pub(crate) fn sibling(&self, name: &str) -> DbxResult<Table> {
        let schema = self.core.schema.upgrade().ok_or_else(|| DbxError::InvalidOperation {
            message: format!("schema of table '{}' was dropped", self.name()),
            context: format!("resolving table '{name}'"),
        })?;
        schema
            .tables
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DbxError::TableNotFound(name.to_string()))
    }

    fn insert_values(
        &self,
        kind: StatementKind,
        values: BTreeMap<String, ScalarValue>,
    ) -> DbxResult<ExecOutcome> {
        let (columns, params): (Vec<String>, Vec<ScalarValue>) = values.into_iter().unzip();
        let name = self.name();
        self.run_execute(
            kind,
            &column_set_shape(&columns),
            || sql::insert(name, &columns),
            &params,
        )
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = DbxResult<Row>;
    type IntoIter = TableIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
