//! Persisted download job index.
//!
//! The executor's jobs survive process restarts through this repository; the
//! tracker seeds its map from it (via the executor) exactly once at startup.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use bridge_traits::database::{DatabaseAdapter, QueryRow, QueryValue};
use core_store::models::TrackId;
use tracing::{debug, error, instrument};

use crate::error::{DownloadError, Result};
use crate::job::{DownloadJob, JobState};

/// Repository for the persisted job index.
#[async_trait]
pub trait JobIndexRepository: Send + Sync {
    /// Initialize the repository (create tables if needed).
    async fn initialize(&self) -> Result<()>;

    /// Load every persisted job.
    async fn load_all(&self) -> Result<Vec<DownloadJob>>;

    /// Insert or update a job row.
    async fn upsert(&self, job: &DownloadJob) -> Result<()>;

    /// Delete a job row.
    async fn delete(&self, track_id: &TrackId) -> Result<()>;
}

// ============================================================================
// SQLite implementation
// ============================================================================

/// SQLite implementation of `JobIndexRepository`.
pub struct SqliteJobIndexRepository {
    db: Arc<dyn DatabaseAdapter>,
}

impl SqliteJobIndexRepository {
    pub fn new(db: Arc<dyn DatabaseAdapter>) -> Self {
        Self { db }
    }

    fn row_to_job(row: &QueryRow) -> Result<DownloadJob> {
        let state_str = get_string(row, "state")?;
        let state = JobState::from_str(&state_str)?;

        Ok(DownloadJob {
            track_id: TrackId::from(get_string(row, "track_id")?),
            state,
            encoding_hint: get_optional_i64(row, "encoding_hint")?.map(|v| v as i32),
            bytes_downloaded: get_i64(row, "bytes_downloaded")? as u64,
            last_error: get_optional_string(row, "last_error")?,
            created_at: get_i64(row, "created_at")?,
            updated_at: get_i64(row, "updated_at")?,
        })
    }
}

#[async_trait]
impl JobIndexRepository for SqliteJobIndexRepository {
    #[instrument(skip(self))]
    async fn initialize(&self) -> Result<()> {
        debug!("Initializing download job index");

        let statements = [
            (
                "CREATE TABLE IF NOT EXISTS download_jobs (
                    track_id TEXT PRIMARY KEY NOT NULL,
                    state TEXT NOT NULL,
                    encoding_hint INTEGER,
                    bytes_downloaded INTEGER NOT NULL DEFAULT 0,
                    last_error TEXT,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                )",
                &[] as &[QueryValue],
            ),
            (
                "CREATE INDEX IF NOT EXISTS idx_download_jobs_state ON download_jobs(state)",
                &[],
            ),
        ];

        self.db.execute_batch(&statements).await.map_err(|e| {
            error!("Failed to create download_jobs table: {}", e);
            DownloadError::Index(format!("Failed to initialize job index: {}", e))
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_all(&self) -> Result<Vec<DownloadJob>> {
        let rows = self
            .db
            .query("SELECT * FROM download_jobs", &[])
            .await
            .map_err(|e| DownloadError::Index(format!("Failed to load job index: {}", e)))?;

        rows.iter().map(Self::row_to_job).collect()
    }

    #[instrument(skip(self, job), fields(track_id = %job.track_id, state = %job.state))]
    async fn upsert(&self, job: &DownloadJob) -> Result<()> {
        let sql = r#"
            INSERT INTO download_jobs (
                track_id, state, encoding_hint, bytes_downloaded,
                last_error, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(track_id) DO UPDATE SET
                state = excluded.state,
                encoding_hint = excluded.encoding_hint,
                bytes_downloaded = excluded.bytes_downloaded,
                last_error = excluded.last_error,
                updated_at = excluded.updated_at
        "#;

        let params = vec![
            QueryValue::Text(job.track_id.to_string()),
            QueryValue::Text(job.state.as_str().to_string()),
            job.encoding_hint
                .map(|v| QueryValue::Integer(v as i64))
                .unwrap_or(QueryValue::Null),
            QueryValue::Integer(job.bytes_downloaded as i64),
            job.last_error
                .as_ref()
                .map(|s| QueryValue::Text(s.clone()))
                .unwrap_or(QueryValue::Null),
            QueryValue::Integer(job.created_at),
            QueryValue::Integer(job.updated_at),
        ];

        self.db.execute(sql, &params).await.map_err(|e| {
            error!("Failed to upsert job: {}", e);
            DownloadError::Index(format!("Failed to persist job: {}", e))
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, track_id: &TrackId) -> Result<()> {
        let sql = "DELETE FROM download_jobs WHERE track_id = ?";
        let params = vec![QueryValue::Text(track_id.to_string())];

        self.db
            .execute(sql, &params)
            .await
            .map_err(|e| DownloadError::Index(format!("Failed to delete job: {}", e)))?;

        Ok(())
    }
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// In-memory job index for ephemeral profiles and tests.
#[derive(Default)]
pub struct MemoryJobIndexRepository {
    jobs: Mutex<HashMap<TrackId, DownloadJob>>,
}

impl MemoryJobIndexRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobIndexRepository for MemoryJobIndexRepository {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<DownloadJob>> {
        Ok(self.jobs.lock().values().cloned().collect())
    }

    async fn upsert(&self, job: &DownloadJob) -> Result<()> {
        self.jobs.lock().insert(job.track_id.clone(), job.clone());
        Ok(())
    }

    async fn delete(&self, track_id: &TrackId) -> Result<()> {
        self.jobs.lock().remove(track_id);
        Ok(())
    }
}

// ============================================================================
// Row helpers
// ============================================================================

fn get_string(row: &QueryRow, key: &str) -> Result<String> {
    row.get(key)
        .and_then(|value| value.as_string())
        .ok_or_else(|| DownloadError::Index(format!("Missing column: {}", key)))
}

fn get_optional_string(row: &QueryRow, key: &str) -> Result<Option<String>> {
    Ok(match row.get(key) {
        Some(QueryValue::Null) | None => None,
        Some(value) => Some(value.as_string().ok_or_else(|| {
            DownloadError::Index(format!("Invalid type for column: {}", key))
        })?),
    })
}

fn get_i64(row: &QueryRow, key: &str) -> Result<i64> {
    row.get(key)
        .and_then(|value| value.as_i64())
        .ok_or_else(|| DownloadError::Index(format!("Missing column: {}", key)))
}

fn get_optional_i64(row: &QueryRow, key: &str) -> Result<Option<i64>> {
    Ok(match row.get(key) {
        Some(QueryValue::Null) | None => None,
        Some(value) => Some(value.as_i64().ok_or_else(|| {
            DownloadError::Index(format!("Invalid type for column: {}", key))
        })?),
    })
}
