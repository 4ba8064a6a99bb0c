//! Proxy configuration
//!
//! Defaults, `DBX_PROXY_*` environment overrides and JSON persistence.

use crate::error::{DbxError, DbxResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

pub const ENV_AUTO_UPDATE_TIMESTAMP: &str = "DBX_PROXY_AUTO_UPDATE_TIMESTAMP";
pub const ENV_UPDATED_AT_COLUMN: &str = "DBX_PROXY_UPDATED_AT_COLUMN";
/// `0` or unset keeps the unbounded cache
pub const ENV_ROW_CACHE_CAPACITY: &str = "DBX_PROXY_ROW_CACHE_CAPACITY";
pub const ENV_ITER_BATCH_SIZE: &str = "DBX_PROXY_ITER_BATCH_SIZE";

/// Identity cache retention policy
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowCachePolicy {
    /// Handles live until an explicit clear
    #[default]
    Unbounded,
    /// At most `capacity` handles per table; evicted rows get a fresh handle
    /// on their next lookup, so identity is only stable while cached.
    Lru { capacity: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Stamp `updated_at_column` with `CURRENT_TIMESTAMP` on every update
    pub auto_update_timestamp: bool,
    pub updated_at_column: String,
    pub row_cache: RowCachePolicy,
    /// Ids fetched per page while iterating a table
    pub iter_batch_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            auto_update_timestamp: true,
            updated_at_column: "updated_at".to_string(),
            row_cache: RowCachePolicy::Unbounded,
            iter_batch_size: 256,
        }
    }
}

impl ProxyConfig {
    /// Defaults overridden by `DBX_PROXY_*` environment variables
    pub fn from_env() -> DbxResult<Self> {
        Self::default().apply_env_from(|name| env::var(name).ok())
    }

    /// Apply overrides from `lookup` (an environment-variable reader).
    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> DbxResult<Self> {
        if let Some(value) = lookup(ENV_AUTO_UPDATE_TIMESTAMP) {
            self.auto_update_timestamp = parse_flag(ENV_AUTO_UPDATE_TIMESTAMP, &value)?;
        }
        if let Some(value) = lookup(ENV_UPDATED_AT_COLUMN)
            && !value.trim().is_empty()
        {
            self.updated_at_column = value.trim().to_string();
        }
        if let Some(value) = lookup(ENV_ROW_CACHE_CAPACITY) {
            self.row_cache = match parse_usize(ENV_ROW_CACHE_CAPACITY, &value)? {
                0 => RowCachePolicy::Unbounded,
                capacity => RowCachePolicy::Lru { capacity },
            };
        }
        if let Some(value) = lookup(ENV_ITER_BATCH_SIZE) {
            self.iter_batch_size = parse_usize(ENV_ITER_BATCH_SIZE, &value)?;
        }
        Ok(self)
    }

    /// 파일에서 로드
    pub fn load(path: impl AsRef<Path>) -> DbxResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// 파일에 저장
    pub fn save(&self, path: impl AsRef<Path>) -> DbxResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }

    pub fn with_row_cache(mut self, policy: RowCachePolicy) -> Self {
        self.row_cache = policy;
        self
    }

    pub fn with_auto_update_timestamp(mut self, enabled: bool) -> Self {
        self.auto_update_timestamp = enabled;
        self
    }

    pub fn with_iter_batch_size(mut self, size: usize) -> Self {
        self.iter_batch_size = size;
        self
    }

    /// Effective page size; never zero
    pub(crate) fn batch_size(&self) -> usize {
        self.iter_batch_size.max(1)
    }
}

fn parse_flag(name: &str, value: &str) -> DbxResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(invalid_env(name, other)),
    }
}

fn parse_usize(name: &str, value: &str) -> DbxResult<usize> {
    value.trim().parse().map_err(|_| invalid_env(name, value))
}

fn invalid_env(name: &str, value: &str) -> DbxError {
    DbxError::InvalidOperation {
        message: format!("invalid value '{value}'"),
        context: name.to_string(),
    }
}
