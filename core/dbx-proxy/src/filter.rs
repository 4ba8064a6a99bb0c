//! Filter Key Encoder
//!
//! A [`Filter`] is a partial row: each named column carries a [`Condition`].
//! [`encode`] turns it into an [`EncodedFilter`]: a canonical [`FilterKey`]
//! naming the statement shape, the where-clause terms, and the parameters to bind.
//!
//! Key grammar, one segment per column in ascending column order:
//!
//! ```text
//! |"column"(=)          Equals(value)   → "column" = ?n   (value bound)
//! |"column"(null)       IsNull          → "column" IS NULL
//! |"column"(not null)   IsNotNull       → "column" IS NOT NULL
//! ```
//!
//! Column names are written as quoted SQL identifiers (inner quotes doubled),
//! so the key is injective over (column set × condition shape): two filters
//! that need different statements never share a key, and two filters that
//! differ only in bound values always do.

use crate::codec;
use crate::error::{DbxError, DbxResult};
use crate::statement::sql::quote_ident;
use crate::value::{IntoValue, ScalarValue, Value};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// Per-column predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Value),
    IsNull,
    IsNotNull,
}

/// AND-combined per-column conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: BTreeMap<String, Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on the primary key
    pub fn by_id(id: i64) -> Self {
        Self::new().eq("id", id)
    }

    /// `column = value`; a null value becomes `column IS NULL`
    pub fn eq(mut self, column: impl Into<String>, value: impl IntoValue) -> Self {
        let condition = match value.into_value() {
            Value::Null => Condition::IsNull,
            value => Condition::Equals(value),
        };
        self.conditions.insert(column.into(), condition);
        self
    }

    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.conditions.insert(column.into(), Condition::IsNull);
        self
    }

    pub fn not_null(mut self, column: impl Into<String>) -> Self {
        self.conditions.insert(column.into(), Condition::IsNotNull);
        self
    }

    pub fn with_condition(mut self, column: impl Into<String>, condition: Condition) -> Self {
        self.conditions.insert(column.into(), condition);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Condition> {
        self.conditions.get(column)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Condition> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl IntoIterator for Filter {
    type Item = (String, Condition);
    type IntoIter = btree_map::IntoIter<String, Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditions.into_iter()
    }
}

impl<K: Into<String>, V: IntoValue> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Filter::new(), |filter, (column, value)| filter.eq(column, value))
    }
}

/// Shape of one where-clause term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermOp {
    Eq,
    IsNull,
    IsNotNull,
}

impl TermOp {
    fn key_suffix(self) -> &'static str {
        match self {
            TermOp::Eq => "(=)",
            TermOp::IsNull => "(null)",
            TermOp::IsNotNull => "(not null)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterTerm {
    pub column: String,
    pub op: TermOp,
}

/// Canonical statement-shape key of a filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterKey(String);

impl FilterKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output of [`encode`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFilter {
    pub key: FilterKey,
    pub terms: Vec<FilterTerm>,
    /// Bound values for `Eq` terms, in term order
    pub params: Vec<ScalarValue>,
}

/// Normalize a filter into its cache key and bindable parameters.
///
/// Fails on an empty filter: an empty filter is a programmer error, never
/// a "match everything" query.
pub fn encode(filter: &Filter, operation: &'static str) -> DbxResult<EncodedFilter> {
    if filter.is_empty() {
        return Err(DbxError::EmptyFilter { operation });
    }

    let mut key = String::new();
    let mut terms = Vec::with_capacity(filter.len());
    let mut params = Vec::new();

    for (column, condition) in filter.iter() {
        let op = match condition {
            Condition::IsNull => TermOp::IsNull,
            Condition::IsNotNull => TermOp::IsNotNull,
            Condition::Equals(value) => match codec::to_storage(value.clone())? {
                // Equals(Null) built by hand: same statement as IS NULL
                ScalarValue::Null => TermOp::IsNull,
                stored => {
                    params.push(stored);
                    TermOp::Eq
                }
            },
        };
        key.push('|');
        key.push_str(&quote_ident(column));
        key.push_str(op.key_suffix());
        terms.push(FilterTerm {
            column: column.clone(),
            op,
        });
    }

    Ok(EncodedFilter {
        key: FilterKey(key),
        terms,
        params,
    })
}
