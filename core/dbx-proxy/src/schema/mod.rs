//! Schema declaration and table registry
//!
//! ```no_run
//! use dbx_proxy::{Schema, SqliteStore, TableDef};
//! use std::sync::Arc;
//!
//! # fn main() -> dbx_proxy::DbxResult<()> {
//! let store = Arc::new(SqliteStore::open("app.db")?);
//! let schema = Schema::builder(store)
//!     .table(TableDef::new("user"))
//!     .table(TableDef::new("post").relation("author", "user_id", "user"))
//!     .build()?;
//! let post = schema.table("post")?;
//! # Ok(())
//! # }
//! ```

pub mod ddl;

use crate::config::ProxyConfig;
use crate::error::{DbxError, DbxResult};
use crate::store::Store;
use crate::table::Table;
use ahash::AHashSet;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// A relation field: `name` resolves through `foreign_key` to a row of `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub foreign_key: String,
    pub target: String,
}

/// Declaration of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    name: String,
    /// `None` → discovered from the stored `CREATE TABLE`
    columns: Option<Vec<String>>,
    relations: Vec<Relation>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: None,
            relations: Vec::new(),
        }
    }

    /// Declare the columns explicitly instead of reading them from the DDL.
    /// `id` is implicit and dropped if listed.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(
            columns
                .into_iter()
                .map(Into::into)
                .filter(|c: &String| c != "id")
                .collect(),
        );
        self
    }

    pub fn relation(
        mut self,
        name: impl Into<String>,
        foreign_key: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.relations.push(Relation {
            name: name.into(),
            foreign_key: foreign_key.into(),
            target: target.into(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub(crate) struct SchemaInner {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) config: ProxyConfig,
    pub(crate) tables: DashMap<String, Table>,
}

/// Registry of the virtualized tables of one store.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

pub struct SchemaBuilder {
    store: Arc<dyn Store>,
    config: ProxyConfig,
    defs: Vec<TableDef>,
}

impl SchemaBuilder {
    pub fn config(mut self, config: ProxyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn table(mut self, def: TableDef) -> Self {
        self.defs.push(def);
        self
    }

    pub fn tables(mut self, defs: impl IntoIterator<Item = TableDef>) -> Self {
        self.defs.extend(defs);
        self
    }

    /// Resolve columns, validate relations and create the table handles.
    pub fn build(self) -> DbxResult<Schema> {
        let mut names = AHashSet::new();
        for def in &self.defs {
            if !names.insert(def.name.as_str()) {
                return Err(DbxError::Schema(format!("table '{}' declared twice", def.name)));
            }
        }

        let mut resolved = Vec::with_capacity(self.defs.len());
        for def in &self.defs {
            let columns = match &def.columns {
                Some(columns) => columns.clone(),
                None => {
                    let ddl = self
                        .store
                        .table_ddl(&def.name)?
                        .ok_or_else(|| DbxError::TableNotFound(def.name.clone()))?;
                    ddl::discover_columns(&ddl)?
                }
            };
            validate(def, &columns, &names)?;
            resolved.push((def.name.clone(), columns, def.relations.clone()));
        }

        let store = self.store;
        let config = self.config;
        let inner = Arc::new_cyclic(|weak| {
            let tables = DashMap::new();
            for (name, columns, relations) in resolved {
                let table = Table::new(
                    name.clone(),
                    columns,
                    relations,
                    Arc::clone(&store),
                    weak.clone(),
                    config.clone(),
                );
                tables.insert(name, table);
            }
            SchemaInner {
                store: Arc::clone(&store),
                config: config.clone(),
                tables,
            }
        });

        info!(target: "dbx_proxy", tables = inner.tables.len(), "schema built");
        Ok(Schema { inner })
    }
}

fn validate(def: &TableDef, columns: &[String], tables: &AHashSet<&str>) -> DbxResult<()> {
    let mut seen = AHashSet::new();
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(DbxError::Schema(format!(
                "column '{}' listed twice on table '{}'",
                column, def.name
            )));
        }
    }

    for relation in &def.relations {
        if relation.name == "id" || seen.contains(relation.name.as_str()) {
            return Err(DbxError::Schema(format!(
                "relation '{}' on table '{}' shadows a column",
                relation.name, def.name
            )));
        }
        if !seen.contains(relation.foreign_key.as_str()) {
            return Err(DbxError::Schema(format!(
                "relation '{}' on table '{}' uses undeclared column '{}'",
                relation.name, def.name, relation.foreign_key
            )));
        }
        if !tables.contains(relation.target.as_str()) {
            return Err(DbxError::Schema(format!(
                "relation '{}' on table '{}' targets undeclared table '{}'",
                relation.name, def.name, relation.target
            )));
        }
    }
    Ok(())
}

impl Schema {
    pub fn builder(store: Arc<dyn Store>) -> SchemaBuilder {
        SchemaBuilder {
            store,
            config: ProxyConfig::default(),
            defs: Vec::new(),
        }
    }

    pub fn table(&self, name: &str) -> DbxResult<Table> {
        self.inner
            .tables
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DbxError::TableNotFound(name.to_string()))
    }

    /// Every declared table, ordered by name
    pub fn tables(&self) -> Vec<Table> {
        let mut tables: Vec<Table> = self
            .inner
            .tables
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        tables.sort_by(|a, b| a.name().cmp(b.name()));
        tables
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.inner.config
    }

    /// Drop every cached row handle of every table. Returns how many were dropped.
    pub fn clear_cache(&self) -> usize {
        self.inner
            .tables
            .iter()
            .map(|entry| entry.value().clear_cache())
            .sum()
    }

    /// Drop every compiled statement of every table.
    pub fn clear_statements(&self) {
        for entry in self.inner.tables.iter() {
            entry.value().clear_statements();
        }
    }
}
