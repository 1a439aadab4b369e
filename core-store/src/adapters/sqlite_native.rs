//! Native SQLite Database Adapter
//!
//! Implements the `DatabaseAdapter` trait using `sqlx` with the native SQLite
//! driver.
//!
//! ## Features
//!
//! - Connection pooling with configurable limits
//! - WAL mode for better concurrency
//! - Prepared statement caching
//! - Foreign key enforcement

use async_trait::async_trait;
use bridge_traits::database::{DatabaseAdapter, DatabaseConfig, QueryRow, QueryValue};
use bridge_traits::error::{BridgeError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Column, Pool, Row, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Native SQLite implementation of `DatabaseAdapter`
///
/// Wraps a `sqlx::Pool<Sqlite>` and implements all database operations using
/// the native SQLite driver.
pub struct SqliteAdapter {
    pool: Pool<Sqlite>,
}

impl SqliteAdapter {
    /// Create a new adapter with the given configuration.
    ///
    /// Establishes the connection pool and configures SQLite options. The
    /// database file is created if missing.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or pool creation fails.
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        info!(
            database_url = %config.database_url,
            max_connections = config.max_connections,
            "Creating SQLite database adapter"
        );

        let mut connect_options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| BridgeError::DatabaseError(format!("Invalid database URL: {}", e)))?;

        connect_options = connect_options
            // WAL mode for concurrent readers during resolution
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true);

        if config.enable_cache {
            connect_options = connect_options.statement_cache_capacity(config.cache_capacity);
        }

        let pool = SqlitePoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create connection pool");
                BridgeError::DatabaseError(format!("Connection pool creation failed: {}", e))
            })?;

        debug!(connections = pool.size(), "SQLite connection pool created");

        Ok(Self { pool })
    }

    /// Create an adapter from an existing pool.
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Convert a sqlx row to a `QueryRow` (column name → value map).
    fn row_to_query_row(row: &sqlx::sqlite::SqliteRow) -> QueryRow {
        let mut result = HashMap::new();

        for column in row.columns() {
            let column_name = column.name().to_string();

            let value = if let Ok(v) = row.try_get::<Option<i64>, _>(column.ordinal()) {
                v.map(QueryValue::Integer).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<f64>, _>(column.ordinal()) {
                v.map(QueryValue::Real).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<String>, _>(column.ordinal()) {
                v.map(QueryValue::Text).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(column.ordinal()) {
                v.map(QueryValue::Blob).unwrap_or(QueryValue::Null)
            } else {
                QueryValue::Null
            };

            result.insert(column_name, value);
        }

        result
    }

    /// Bind `QueryValue` parameters onto a sqlx query.
    fn bind_params<'q>(
        query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        params: &'q [QueryValue],
    ) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        let mut query = query;
        for param in params {
            query = match param {
                QueryValue::Null => query.bind(None::<i64>),
                QueryValue::Integer(i) => query.bind(i),
                QueryValue::Real(r) => query.bind(r),
                QueryValue::Text(s) => query.bind(s.as_str()),
                QueryValue::Blob(b) => query.bind(b.as_slice()),
            };
        }
        query
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Database health check failed");
                BridgeError::DatabaseError(format!("Health check failed: {}", e))
            })?;

        Ok(())
    }

    async fn query(&self, query: &str, params: &[QueryValue]) -> Result<Vec<QueryRow>> {
        debug!(query = %query, param_count = params.len(), "Executing query");

        let sqlx_query = sqlx::query(query);
        let sqlx_query = Self::bind_params(sqlx_query, params);

        let rows = sqlx_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Query failed: {}", e)))?;

        Ok(rows.iter().map(Self::row_to_query_row).collect())
    }

    async fn query_one_optional(
        &self,
        query: &str,
        params: &[QueryValue],
    ) -> Result<Option<QueryRow>> {
        debug!(query = %query, param_count = params.len(), "Executing query_one_optional");

        let sqlx_query = sqlx::query(query);
        let sqlx_query = Self::bind_params(sqlx_query, params);

        let row = sqlx_query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Query one optional failed: {}", e)))?;

        Ok(row.as_ref().map(Self::row_to_query_row))
    }

    async fn execute(&self, statement: &str, params: &[QueryValue]) -> Result<u64> {
        debug!(statement = %statement, param_count = params.len(), "Executing statement");

        let sqlx_query = sqlx::query(statement);
        let sqlx_query = Self::bind_params(sqlx_query, params);

        let result = sqlx_query
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Execute failed: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn execute_batch(&self, statements: &[(&str, &[QueryValue])]) -> Result<Vec<u64>> {
        debug!(batch_size = statements.len(), "Executing batch");

        let mut results = Vec::with_capacity(statements.len());

        for (statement, params) in statements {
            let rows_affected = self.execute(statement, params).await?;
            results.push(rows_affected);
        }

        Ok(results)
    }

    async fn close(&self) -> Result<()> {
        info!("Closing database connection pool");
        self.pool.close().await;
        Ok(())
    }
}
