//! Statement Cache: one compiled statement per operation shape
//!
//! Every table operation names a [`StatementKind`] and a shape string (the
//! column set, the encoded filter key, or both). The first request for a
//! `(kind, shape)` pair synthesizes SQL and compiles it through the [`Store`];
//! every later request returns the same `Arc<PreparedStatement>` without
//! touching the store's compiler.

pub mod prepared;
pub mod sql;

pub use prepared::PreparedStatement;

use crate::error::DbxResult;
use crate::store::Store;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Operation family of a cached statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    SelectColumn,
    SelectRow,
    SelectAll,
    Exists,
    CountAll,
    MaxId,
    IdsAfter,
    IdRange,
    DeleteById,
    DeleteAbove,
    DeleteAll,
    Insert,
    InsertWithId,
    InsertEmpty,
    Update,
    Find,
    Filter,
    Count,
    DeleteWhere,
    Pick,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::SelectColumn => "select_column",
            StatementKind::SelectRow => "select_row",
            StatementKind::SelectAll => "select_all",
            StatementKind::Exists => "exists",
            StatementKind::CountAll => "count_all",
            StatementKind::MaxId => "max_id",
            StatementKind::IdsAfter => "ids_after",
            StatementKind::IdRange => "id_range",
            StatementKind::DeleteById => "delete_by_id",
            StatementKind::DeleteAbove => "delete_above",
            StatementKind::DeleteAll => "delete_all",
            StatementKind::Insert => "insert",
            StatementKind::InsertWithId => "insert_with_id",
            StatementKind::InsertEmpty => "insert_empty",
            StatementKind::Update => "update",
            StatementKind::Find => "find",
            StatementKind::Filter => "filter",
            StatementKind::Count => "count",
            StatementKind::DeleteWhere => "delete_where",
            StatementKind::Pick => "pick",
        }
    }
}

/// Cache key: (operation kind, canonical shape)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementKey {
    pub kind: StatementKind,
    pub shape: String,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
}

impl CacheStats {
    pub(crate) fn from_counters(hits: u64, misses: u64) -> Self {
        let total = hits + misses;
        Self {
            hits,
            misses,
            hit_ratio: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }
}

/// Per-table prepared statement cache
pub struct StatementCache {
    table: String,
    statements: Mutex<AHashMap<StatementKey, Arc<PreparedStatement>>>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl StatementCache {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            statements: Mutex::new(AHashMap::new()),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    /// Return the statement for `(kind, shape)`, compiling `synthesize()` on first use.
    ///
    /// The cache lock is held across compilation, so a shape is compiled at
    /// most once per cache generation even with concurrent callers.
    pub fn get_or_create(
        &self,
        store: &dyn Store,
        kind: StatementKind,
        shape: &str,
        synthesize: impl FnOnce() -> String,
    ) -> DbxResult<Arc<PreparedStatement>> {
        let mut statements = self.statements.lock();
        let key = StatementKey {
            kind,
            shape: shape.to_string(),
        };
        if let Some(stmt) = statements.get(&key) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(stmt));
        }

        let sql = synthesize();
        let stmt = Arc::new(store.prepare(&sql)?);
        debug!(
            target: "dbx_proxy",
            table = %self.table,
            kind = kind.as_str(),
            sql = %stmt.sql(),
            "statement compiled"
        );
        self.miss_count.fetch_add(1, Ordering::Relaxed);
        statements.insert(key, Arc::clone(&stmt));
        Ok(stmt)
    }

    /// Number of compiled statements held
    pub fn len(&self) -> usize {
        self.statements.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats::from_counters(
            self.hit_count.load(Ordering::Relaxed),
            self.miss_count.load(Ordering::Relaxed),
        )
    }

    /// Drop every compiled statement. Only needed on a process-wide reset:
    /// statements hold no row state and never go stale.
    pub fn clear(&self) {
        let mut statements = self.statements.lock();
        debug!(target: "dbx_proxy", table = %self.table, dropped = statements.len(), "statement cache cleared");
        statements.clear();
        self.hit_count.store(0, Ordering::Relaxed);
        self.miss_count.store(0, Ordering::Relaxed);
    }
}
