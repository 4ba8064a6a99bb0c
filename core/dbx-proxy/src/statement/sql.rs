//! SQL synthesis for every statement shape the table engine issues.
//!
//! Identifiers come from configuration and are always quoted; values never
//! appear in the text, only as positional `?n` parameters.

use crate::filter::{FilterTerm, TermOp};

/// Quote an SQL identifier, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for ch in name.chars() {
        if ch == '"' {
            quoted.push('"');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Canonical shape of an ordered column list
pub fn column_set_shape(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render `a = ?n AND b IS NULL ...`, numbering bound terms from `first_param`.
pub fn where_clause(terms: &[FilterTerm], first_param: usize) -> String {
    let mut index = first_param;
    terms
        .iter()
        .map(|term| {
            let column = quote_ident(&term.column);
            match term.op {
                TermOp::IsNull => format!("{column} IS NULL"),
                TermOp::IsNotNull => format!("{column} IS NOT NULL"),
                TermOp::Eq => {
                    let fragment = format!("{column} = ?{index}");
                    index += 1;
                    fragment
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

pub fn select_column(table: &str, column: &str) -> String {
    format!(
        "SELECT {} FROM {} WHERE id = ?1",
        quote_ident(column),
        quote_ident(table)
    )
}

pub fn select_row(table: &str) -> String {
    format!("SELECT * FROM {} WHERE id = ?1 LIMIT 1", quote_ident(table))
}

pub fn select_all(table: &str) -> String {
    format!("SELECT * FROM {} ORDER BY id", quote_ident(table))
}

pub fn exists(table: &str) -> String {
    format!(
        "SELECT count(*) FROM {} WHERE id = ?1 LIMIT 1",
        quote_ident(table)
    )
}

pub fn count_all(table: &str) -> String {
    format!("SELECT count(*) FROM {}", quote_ident(table))
}

pub fn max_id(table: &str) -> String {
    format!("SELECT max(id) FROM {}", quote_ident(table))
}

/// Keyset page: ids strictly after `?1`, at most `?2` of them
pub fn ids_after(table: &str) -> String {
    format!(
        "SELECT id FROM {} WHERE id > ?1 ORDER BY id LIMIT ?2",
        quote_ident(table)
    )
}

/// `start` is inclusive, `end` exclusive
pub fn id_range(table: &str, has_start: bool, has_end: bool) -> String {
    let table = quote_ident(table);
    match (has_start, has_end) {
        (false, false) => format!("SELECT id FROM {table} ORDER BY id"),
        (true, false) => format!("SELECT id FROM {table} WHERE id >= ?1 ORDER BY id"),
        (false, true) => format!("SELECT id FROM {table} WHERE id < ?1 ORDER BY id"),
        (true, true) => {
            format!("SELECT id FROM {table} WHERE id >= ?1 AND id < ?2 ORDER BY id")
        }
    }
}

pub fn delete_by_id(table: &str) -> String {
    format!("DELETE FROM {} WHERE id = ?1", quote_ident(table))
}

/// Truncate from the tail: every id above `?1`
pub fn delete_above(table: &str) -> String {
    format!("DELETE FROM {} WHERE id > ?1", quote_ident(table))
}

pub fn delete_all(table: &str) -> String {
    format!("DELETE FROM {}", quote_ident(table))
}

pub fn insert(table: &str, columns: &[String]) -> String {
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", "),
        placeholders
    )
}

pub fn insert_empty(table: &str) -> String {
    format!("INSERT INTO {} (id) VALUES (NULL)", quote_ident(table))
}

/// `UPDATE ... SET cols [, stamp = CURRENT_TIMESTAMP] WHERE terms`
///
/// Set values take `?1..?n`; bound filter values follow.
pub fn update(table: &str, columns: &[String], stamp: Option<&str>, terms: &[FilterTerm]) -> String {
    let mut assignments = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ?{}", quote_ident(c), i + 1))
        .collect::<Vec<_>>();
    if let Some(stamp) = stamp {
        assignments.push(format!("{} = CURRENT_TIMESTAMP", quote_ident(stamp)));
    }
    format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(table),
        assignments.join(", "),
        where_clause(terms, columns.len() + 1)
    )
}

pub fn find(table: &str, terms: &[FilterTerm]) -> String {
    format!(
        "SELECT id FROM {} WHERE {} ORDER BY id LIMIT 1",
        quote_ident(table),
        where_clause(terms, 1)
    )
}

pub fn filter(table: &str, terms: &[FilterTerm]) -> String {
    format!(
        "SELECT id FROM {} WHERE {} ORDER BY id",
        quote_ident(table),
        where_clause(terms, 1)
    )
}

pub fn count(table: &str, terms: &[FilterTerm]) -> String {
    format!(
        "SELECT count(*) FROM {} WHERE {}",
        quote_ident(table),
        where_clause(terms, 1)
    )
}

pub fn delete_where(table: &str, terms: &[FilterTerm]) -> String {
    format!(
        "DELETE FROM {} WHERE {}",
        quote_ident(table),
        where_clause(terms, 1)
    )
}

pub fn pick(table: &str, columns: &[String], terms: Option<&[FilterTerm]>) -> String {
    let projection = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    match terms {
        Some(terms) if !terms.is_empty() => format!(
            "SELECT {} FROM {} WHERE {} ORDER BY id",
            projection,
            quote_ident(table),
            where_clause(terms, 1)
        ),
        _ => format!("SELECT {} FROM {} ORDER BY id", projection, quote_ident(table)),
    }
}
