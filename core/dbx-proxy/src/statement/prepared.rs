use crate::error::{DbxError, DbxResult};
use crate::value::ScalarValue;

/// Compiled SQL statement for efficient repeated execution
///
/// Carries the synthesized SQL text, the number of positional parameters
/// (`?1`, `?2`, ...) and the result column names reported at compile time.
/// Holds no row-specific state, so one instance serves every call of its shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    sql: String,
    param_count: usize,
    columns: Vec<String>,
}

impl PreparedStatement {
    pub fn new(sql: String, param_count: usize, columns: Vec<String>) -> Self {
        Self {
            sql,
            param_count,
            columns,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Result columns; empty for DML
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Validate that the correct number of parameters are provided
    pub fn validate_params(&self, params: &[ScalarValue]) -> DbxResult<()> {
        if params.len() != self.param_count {
            return Err(DbxError::InvalidOperation {
                message: format!(
                    "Expected {} parameters, got {}",
                    self.param_count,
                    params.len()
                ),
                context: self.sql.clone(),
            });
        }
        Ok(())
    }
}
