//! Column discovery from stored `CREATE TABLE` text

use crate::error::{DbxError, DbxResult};
use sqlparser::ast::{CreateTable, Statement};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

/// Column names declared by a `CREATE TABLE` statement, in declaration
/// order, excluding the `id` primary key.
pub fn discover_columns(ddl: &str) -> DbxResult<Vec<String>> {
    let statements = Parser::parse_sql(&SQLiteDialect {}, ddl).map_err(|e| DbxError::SqlParse {
        message: e.to_string(),
        sql: ddl.to_string(),
    })?;

    match statements.first() {
        Some(Statement::CreateTable(CreateTable { columns, .. })) => Ok(columns
            .iter()
            .map(|col| col.name.value.clone())
            .filter(|name| !name.eq_ignore_ascii_case("id"))
            .collect()),
        _ => Err(DbxError::SqlParse {
            message: "expected CREATE TABLE".to_string(),
            sql: ddl.to_string(),
        }),
    }
}
