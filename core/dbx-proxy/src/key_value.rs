//! JSON-valued tables
//!
//! Each key-value table is `(id integer primary key, value json)`: the id is
//! the key and the value is any serde-serializable document. Tables are created
//! on first access and run on the same statement machinery as schema tables.

use crate::codec;
use crate::config::ProxyConfig;
use crate::error::DbxResult;
use crate::record::Patch;
use crate::statement::sql::quote_ident;
use crate::store::Store;
use crate::table::Table;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use tracing::debug;

const VALUE_COLUMN: &str = "value";

pub struct KeyValueStore {
    store: Arc<dyn Store>,
    config: ProxyConfig,
    tables: DashMap<String, Table>,
}

impl KeyValueStore {
    pub fn new(store: Arc<dyn Store>, config: ProxyConfig) -> Self {
        Self {
            store,
            config,
            tables: DashMap::new(),
        }
    }

    /// Typed view of table `name`, creating the table if it does not exist.
    pub fn table<T>(&self, name: &str) -> DbxResult<KeyValueTable<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        if let Some(table) = self.tables.get(name) {
            return Ok(KeyValueTable::new(table.value().clone()));
        }

        self.store.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY, value JSON)",
            quote_ident(name)
        ))?;
        debug!(target: "dbx_proxy", table = %name, "key-value table ready");

        let table = self
            .tables
            .entry(name.to_string())
            .or_insert_with(|| {
                Table::new(
                    name.to_string(),
                    vec![VALUE_COLUMN.to_string()],
                    Vec::new(),
                    Arc::clone(&self.store),
                    Weak::new(),
                    self.config.clone(),
                )
            })
            .value()
            .clone();
        Ok(KeyValueTable::new(table))
    }

    /// Drop every cached row handle of every key-value table.
    pub fn clear_cache(&self) -> usize {
        self.tables
            .iter()
            .map(|entry| entry.value().clear_cache())
            .sum()
    }
}

/// A table of JSON documents of type `T`, keyed by id.
pub struct KeyValueTable<T> {
    table: Table,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for KeyValueTable<T> {
    fn clone(&self) -> Self {
        Self::new(self.table.clone())
    }
}

impl<T> KeyValueTable<T> {
    fn new(table: Table) -> Self {
        Self {
            table,
            _marker: PhantomData,
        }
    }

    /// Underlying table handle
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn contains(&self, id: i64) -> DbxResult<bool> {
        self.table.contains(id)
    }

    pub fn delete(&self, id: i64) -> DbxResult<usize> {
        self.table.delete(id)
    }

    pub fn len(&self) -> DbxResult<usize> {
        self.table.len()
    }

    pub fn is_empty(&self) -> DbxResult<bool> {
        self.table.is_empty()
    }

    /// Delete every entry whose id exceeds `n`
    pub fn set_len(&self, n: i64) -> DbxResult<usize> {
        self.table.set_len(n)
    }

    pub fn truncate(&self) -> DbxResult<usize> {
        self.table.truncate()
    }
}

impl<T: Serialize + DeserializeOwned> KeyValueTable<T> {
    /// Decoded value at `id`; `None` when absent or stored as `NULL`.
    pub fn get(&self, id: i64) -> DbxResult<Option<T>> {
        let stored = self.table.select_column(id, VALUE_COLUMN)?;
        codec::decode_json(stored.as_ref())
    }

    /// Insert or replace the value at `id`.
    pub fn set(&self, id: i64, value: &T) -> DbxResult<()> {
        self.table
            .set(id, Patch::new().with(VALUE_COLUMN, codec::encode_json(value)?))
    }

    /// Append a value and return its id.
    pub fn push(&self, value: &T) -> DbxResult<i64> {
        self.table
            .push(Patch::new().with(VALUE_COLUMN, codec::encode_json(value)?))
    }

    /// Entries in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = DbxResult<(i64, Option<T>)>> + '_ {
        self.table.iter().map(|row| {
            let row = row?;
            let value = codec::decode_json(row.get(VALUE_COLUMN)?.as_ref())?;
            Ok((row.id(), value))
        })
    }

    /// Every value in ascending id order
    pub fn materialize_all(&self) -> DbxResult<Vec<Option<T>>> {
        self.table
            .pick(&[VALUE_COLUMN], None)?
            .iter()
            .map(|record| codec::decode_json(record.get(VALUE_COLUMN)))
            .collect()
    }
}
