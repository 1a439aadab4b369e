//! Database Abstraction Layer
//!
//! Platform-agnostic trait for the SQL storage backing persisted metadata
//! (chosen encodings, the download job index). Keeps the core free of a hard
//! dependency on a specific driver; the native `sqlx` adapter lives in
//! `core-store`.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration for adapter initialization
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path or connection string
    pub database_url: String,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,

    /// Enable statement caching
    pub enable_cache: bool,

    /// Statement cache capacity
    pub cache_capacity: usize,
}

impl DatabaseConfig {
    /// Create a new database configuration with the given file path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            min_connections: 1,
            max_connections: 5,
            acquire_timeout_secs: 30,
            enable_cache: true,
            cache_capacity: 100,
        }
    }

    /// Create a configuration for an in-memory database
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 5,
            acquire_timeout_secs: 30,
            enable_cache: true,
            cache_capacity: 100,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

// =============================================================================
// Query Result Types
// =============================================================================

/// A single row from a query as a map of column names to values
pub type QueryRow = std::collections::HashMap<String, QueryValue>;

/// A database value that can be null, integer, real, text, or blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl QueryValue {
    /// Convert to i64 if possible
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            QueryValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert to f64 if possible (integers widen)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            QueryValue::Real(r) => Some(*r),
            QueryValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Convert to an owned String if possible
    pub fn as_string(&self) -> Option<String> {
        match self {
            QueryValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Check whether the value is SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }
}

// =============================================================================
// Adapter Trait
// =============================================================================

/// Database adapter trait
///
/// Repositories own their schema: they issue `CREATE TABLE IF NOT EXISTS`
/// statements through [`execute_batch`](DatabaseAdapter::execute_batch) during
/// their own initialization, so the adapter carries no schema knowledge.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Verify the connection is usable.
    async fn health_check(&self) -> Result<()>;

    /// Run a query returning all matching rows.
    async fn query(&self, query: &str, params: &[QueryValue]) -> Result<Vec<QueryRow>>;

    /// Run a query returning at most one row.
    async fn query_one_optional(
        &self,
        query: &str,
        params: &[QueryValue],
    ) -> Result<Option<QueryRow>>;

    /// Execute a statement, returning the number of affected rows.
    async fn execute(&self, statement: &str, params: &[QueryValue]) -> Result<u64>;

    /// Execute several statements sequentially, returning affected-row counts.
    async fn execute_batch(&self, statements: &[(&str, &[QueryValue])]) -> Result<Vec<u64>>;

    /// Close the underlying connection pool.
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_path() {
        let config = DatabaseConfig::new("/data/streaming.db");
        assert_eq!(config.database_url, "sqlite:/data/streaming.db");
        assert!(config.max_connections >= config.min_connections);
    }

    #[test]
    fn test_in_memory_config() {
        let config = DatabaseConfig::in_memory();
        assert_eq!(config.database_url, "sqlite::memory:");
    }

    #[test]
    fn test_query_value_conversions() {
        assert_eq!(QueryValue::Integer(42).as_i64(), Some(42));
        assert_eq!(QueryValue::Integer(42).as_f64(), Some(42.0));
        assert_eq!(QueryValue::Real(1.5).as_f64(), Some(1.5));
        assert_eq!(
            QueryValue::Text("abc".to_string()).as_string(),
            Some("abc".to_string())
        );
        assert!(QueryValue::Null.is_null());
        assert_eq!(QueryValue::Null.as_i64(), None);
    }
}
