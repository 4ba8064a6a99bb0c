//! Predicate operations: find, filter, count, delete, update and pick

use super::Table;
use crate::error::{DbxError, DbxResult};
use crate::filter::{self, Condition, Filter};
use crate::record::{Patch, Record};
use crate::relation;
use crate::row::Row;
use crate::statement::StatementKind;
use crate::statement::sql::{self, column_set_shape};
use crate::value::ScalarValue;

/// Rows an update applies to
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateTarget {
    Id(i64),
    Filter(Filter),
}

impl From<i64> for UpdateTarget {
    fn from(id: i64) -> Self {
        UpdateTarget::Id(id)
    }
}

impl From<Filter> for UpdateTarget {
    fn from(filter: Filter) -> Self {
        UpdateTarget::Filter(filter)
    }
}

impl Table {
    /// First matching row, lowest id first.
    pub fn find(&self, filter: &Filter) -> DbxResult<Option<Row>> {
        let encoded = filter::encode(&relation::fold_filter(self, filter)?, "find")?;
        let name = self.name();
        let result = self.run_query(
            StatementKind::Find,
            encoded.key.as_str(),
            || sql::find(name, &encoded.terms),
            &encoded.params,
        )?;
        Ok(result.scalar_i64().map(|id| self.row_handle(id)))
    }

    /// Every matching row, ascending by id.
    pub fn filter(&self, filter: &Filter) -> DbxResult<Vec<Row>> {
        let encoded = filter::encode(&relation::fold_filter(self, filter)?, "filter")?;
        let name = self.name();
        let result = self.run_query(
            StatementKind::Filter,
            encoded.key.as_str(),
            || sql::filter(name, &encoded.terms),
            &encoded.params,
        )?;
        Ok(result.ids().into_iter().map(|id| self.row_handle(id)).collect())
    }

    pub fn count(&self, filter: &Filter) -> DbxResult<usize> {
        let encoded = filter::encode(&relation::fold_filter(self, filter)?, "count")?;
        let name = self.name();
        let result = self.run_query(
            StatementKind::Count,
            encoded.key.as_str(),
            || sql::count(name, &encoded.terms),
            &encoded.params,
        )?;
        Ok(result.scalar_i64().unwrap_or(0).max(0) as usize)
    }

    /// Delete every matching row; returns the number deleted.
    pub fn delete_where(&self, filter: &Filter) -> DbxResult<usize> {
        let encoded = filter::encode(&relation::fold_filter(self, filter)?, "delete")?;
        let name = self.name();
        let outcome = self.run_execute(
            StatementKind::DeleteWhere,
            encoded.key.as_str(),
            || sql::delete_where(name, &encoded.terms),
            &encoded.params,
        )?;
        Ok(outcome.changes)
    }

    /// Partial update of one row or every row matching a filter.
    ///
    /// When auto-stamping is enabled and the table has the configured
    /// `updated_at` column, it is set to `CURRENT_TIMESTAMP` unless the patch
    /// sets it explicitly. An empty patch changes nothing and returns 0.
    pub fn update(&self, target: impl Into<UpdateTarget>, mut patch: Patch) -> DbxResult<usize> {
        let filter = match target.into() {
            UpdateTarget::Id(id) => {
                if let Some(value) = patch.remove("id") {
                    relation::check_same_id(self.name(), &value, id)?;
                }
                Filter::by_id(id)
            }
            UpdateTarget::Filter(filter) => {
                if let Some(value) = patch.remove("id") {
                    match filter.get("id") {
                        Some(Condition::Equals(target)) if *target == value => {}
                        _ => {
                            return Err(DbxError::ImmutableId {
                                table: self.name().to_string(),
                            });
                        }
                    }
                }
                relation::fold_filter(self, &filter)?
            }
        };
        let encoded = filter::encode(&filter, "update")?;

        let values = relation::fold_patch(self, patch)?;
        if values.is_empty() {
            return Ok(0);
        }

        let config = self.config();
        let stamp = (config.auto_update_timestamp
            && self.has_column(&config.updated_at_column)
            && !values.contains_key(&config.updated_at_column))
        .then_some(config.updated_at_column.as_str());

        let (columns, mut params): (Vec<String>, Vec<ScalarValue>) = values.into_iter().unzip();
        params.extend(encoded.params);

        let shape = format!(
            "{};{};{}",
            column_set_shape(&columns),
            if stamp.is_some() { "stamp" } else { "" },
            encoded.key
        );
        let name = self.name();
        let outcome = self.run_execute(
            StatementKind::Update,
            &shape,
            || sql::update(name, &columns, stamp, &encoded.terms),
            &params,
        )?;
        Ok(outcome.changes)
    }

    /// Projection of `columns` over all rows, or the rows matching `filter`.
    /// An empty filter is treated as no filter.
    pub fn pick(&self, columns: &[&str], filter: Option<&Filter>) -> DbxResult<Vec<Record>> {
        if columns.is_empty() {
            return Err(DbxError::InvalidOperation {
                message: "pick() expects at least one column".to_string(),
                context: format!("table '{}'", self.name()),
            });
        }
        let columns: Vec<String> = columns
            .iter()
            .map(|&column| {
                if column == "id" || self.has_column(column) {
                    Ok(column.to_string())
                } else {
                    Err(DbxError::unknown_column(self.name(), column))
                }
            })
            .collect::<DbxResult<_>>()?;

        let encoded = match filter {
            Some(filter) if !filter.is_empty() => {
                Some(filter::encode(&relation::fold_filter(self, filter)?, "pick")?)
            }
            _ => None,
        };

        let shape = match &encoded {
            Some(encoded) => format!("{}||{}", column_set_shape(&columns), encoded.key),
            None => column_set_shape(&columns),
        };
        let params = encoded
            .as_ref()
            .map(|e| e.params.clone())
            .unwrap_or_default();
        let name = self.name();
        let result = self.run_query(
            StatementKind::Pick,
            &shape,
            || sql::pick(name, &columns, encoded.as_ref().map(|e| e.terms.as_slice())),
            &params,
        )?;
        Ok(result.into_records())
    }
}
