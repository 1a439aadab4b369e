//! Persistence for the chosen encoding per track.
//!
//! The store is what makes resolution stable across URL-cache misses and
//! process restarts: once an encoding has been chosen for a track, every later
//! resolution reuses it so locally cached bytes and persisted metadata never
//! mix encodings.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use bridge_traits::database::{DatabaseAdapter, QueryRow, QueryValue};
use core_store::models::TrackId;
use tracing::{debug, error, instrument};

use crate::encoding::EncodingDescriptor;
use crate::error::{Result, StreamingError};

/// Store of the chosen encoding per track.
///
/// `put` is an idempotent upsert: repeated concurrent writes of the same
/// (track, encoding) pair converge to the same stored row.
#[async_trait]
pub trait FormatStore: Send + Sync {
    async fn get(&self, track_id: &TrackId) -> Result<Option<EncodingDescriptor>>;

    async fn put(&self, track_id: &TrackId, encoding: &EncodingDescriptor) -> Result<()>;
}

// ============================================================================
// SQLite implementation
// ============================================================================

/// SQLite-backed format store.
pub struct SqliteFormatStore {
    db: Arc<dyn DatabaseAdapter>,
}

impl SqliteFormatStore {
    pub fn new(db: Arc<dyn DatabaseAdapter>) -> Self {
        Self { db }
    }

    /// Create the backing table if needed.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        debug!("Initializing format store");

        let statements = [(
            "CREATE TABLE IF NOT EXISTS chosen_formats (
                track_id TEXT PRIMARY KEY NOT NULL,
                format_tag INTEGER NOT NULL,
                mime_type TEXT NOT NULL,
                codec TEXT NOT NULL,
                bitrate_bps INTEGER NOT NULL,
                sample_rate_hz INTEGER,
                content_length INTEGER,
                loudness_db REAL,
                updated_at INTEGER NOT NULL
            )",
            &[] as &[QueryValue],
        )];

        self.db.execute_batch(&statements).await.map_err(|e| {
            error!("Failed to create chosen_formats table: {}", e);
            StreamingError::Store(format!("Failed to initialize format store: {}", e))
        })?;

        Ok(())
    }

    fn row_to_descriptor(row: &QueryRow) -> Result<EncodingDescriptor> {
        Ok(EncodingDescriptor {
            format_tag: get_i64(row, "format_tag")? as i32,
            mime_type: get_string(row, "mime_type")?,
            codec: get_string(row, "codec")?,
            bitrate_bps: get_i64(row, "bitrate_bps")?,
            sample_rate_hz: get_optional_i64(row, "sample_rate_hz")?.map(|v| v as u32),
            content_length: get_optional_i64(row, "content_length")?.map(|v| v as u64),
            loudness_db: get_optional_f64(row, "loudness_db")?.map(|v| v as f32),
        })
    }
}

#[async_trait]
impl FormatStore for SqliteFormatStore {
    #[instrument(skip(self))]
    async fn get(&self, track_id: &TrackId) -> Result<Option<EncodingDescriptor>> {
        let sql = "SELECT * FROM chosen_formats WHERE track_id = ?";
        let params = vec![QueryValue::Text(track_id.to_string())];

        let row = self
            .db
            .query_one_optional(sql, &params)
            .await
            .map_err(|e| StreamingError::Store(format!("Failed to read chosen format: {}", e)))?;

        match row {
            Some(row) => Self::row_to_descriptor(&row).map(Some),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, encoding), fields(format_tag = encoding.format_tag))]
    async fn put(&self, track_id: &TrackId, encoding: &EncodingDescriptor) -> Result<()> {
        let sql = r#"
            INSERT INTO chosen_formats (
                track_id, format_tag, mime_type, codec, bitrate_bps,
                sample_rate_hz, content_length, loudness_db, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(track_id) DO UPDATE SET
                format_tag = excluded.format_tag,
                mime_type = excluded.mime_type,
                codec = excluded.codec,
                bitrate_bps = excluded.bitrate_bps,
                sample_rate_hz = excluded.sample_rate_hz,
                content_length = excluded.content_length,
                loudness_db = excluded.loudness_db,
                updated_at = excluded.updated_at
        "#;

        let params = vec![
            QueryValue::Text(track_id.to_string()),
            QueryValue::Integer(encoding.format_tag as i64),
            QueryValue::Text(encoding.mime_type.clone()),
            QueryValue::Text(encoding.codec.clone()),
            QueryValue::Integer(encoding.bitrate_bps),
            encoding
                .sample_rate_hz
                .map(|v| QueryValue::Integer(v as i64))
                .unwrap_or(QueryValue::Null),
            encoding
                .content_length
                .map(|v| QueryValue::Integer(v as i64))
                .unwrap_or(QueryValue::Null),
            encoding
                .loudness_db
                .map(|v| QueryValue::Real(v as f64))
                .unwrap_or(QueryValue::Null),
            QueryValue::Integer(chrono::Utc::now().timestamp()),
        ];

        self.db.execute(sql, &params).await.map_err(|e| {
            error!("Failed to upsert chosen format: {}", e);
            StreamingError::Store(format!("Failed to persist chosen format: {}", e))
        })?;

        Ok(())
    }
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// In-memory format store for hosts without durable storage and for tests.
#[derive(Default)]
pub struct MemoryFormatStore {
    entries: Mutex<HashMap<TrackId, EncodingDescriptor>>,
}

impl MemoryFormatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FormatStore for MemoryFormatStore {
    async fn get(&self, track_id: &TrackId) -> Result<Option<EncodingDescriptor>> {
        Ok(self.entries.lock().get(track_id).cloned())
    }

    async fn put(&self, track_id: &TrackId, encoding: &EncodingDescriptor) -> Result<()> {
        self.entries
            .lock()
            .insert(track_id.clone(), encoding.clone());
        Ok(())
    }
}

// ============================================================================
// Row helpers
// ============================================================================

fn get_string(row: &QueryRow, key: &str) -> Result<String> {
    row.get(key)
        .and_then(|value| value.as_string())
        .ok_or_else(|| StreamingError::Store(format!("Missing column: {}", key)))
}

fn get_i64(row: &QueryRow, key: &str) -> Result<i64> {
    row.get(key)
        .and_then(|value| value.as_i64())
        .ok_or_else(|| StreamingError::Store(format!("Missing column: {}", key)))
}

fn get_optional_i64(row: &QueryRow, key: &str) -> Result<Option<i64>> {
    Ok(match row.get(key) {
        Some(QueryValue::Null) | None => None,
        Some(value) => Some(value.as_i64().ok_or_else(|| {
            StreamingError::Store(format!("Invalid type for column: {}", key))
        })?),
    })
}

fn get_optional_f64(row: &QueryRow, key: &str) -> Result<Option<f64>> {
    Ok(match row.get(key) {
        Some(QueryValue::Null) | None => None,
        Some(value) => Some(value.as_f64().ok_or_else(|| {
            StreamingError::Store(format!("Invalid type for column: {}", key))
        })?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::database::DatabaseConfig;
    use core_store::adapters::SqliteAdapter;

    fn descriptor(tag: i32) -> EncodingDescriptor {
        EncodingDescriptor {
            format_tag: tag,
            mime_type: "audio/webm".to_string(),
            codec: "opus".to_string(),
            bitrate_bps: 160_000,
            sample_rate_hz: Some(48_000),
            content_length: Some(4_000_000),
            loudness_db: Some(-3.2),
        }
    }

    async fn sqlite_store() -> SqliteFormatStore {
        let mut config = DatabaseConfig::in_memory();
        config.min_connections = 1;
        config.max_connections = 1;
        let adapter = SqliteAdapter::new(config).await.unwrap();
        let store = SqliteFormatStore::new(Arc::new(adapter));
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryFormatStore::new();
        let track = TrackId::from("t1");

        assert!(store.get(&track).await.unwrap().is_none());

        store.put(&track, &descriptor(251)).await.unwrap();
        let loaded = store.get(&track).await.unwrap().unwrap();
        assert_eq!(loaded.format_tag, 251);
    }

    #[tokio::test]
    async fn test_sqlite_store_round_trip() {
        let store = sqlite_store().await;
        let track = TrackId::from("t1");

        store.put(&track, &descriptor(251)).await.unwrap();

        let loaded = store.get(&track).await.unwrap().unwrap();
        assert_eq!(loaded, descriptor(251));
    }

    #[tokio::test]
    async fn test_sqlite_store_missing_is_none() {
        let store = sqlite_store().await;
        assert!(store.get(&TrackId::from("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_upsert_is_idempotent() {
        let store = sqlite_store().await;
        let track = TrackId::from("t1");

        store.put(&track, &descriptor(251)).await.unwrap();
        store.put(&track, &descriptor(251)).await.unwrap();

        let loaded = store.get(&track).await.unwrap().unwrap();
        assert_eq!(loaded.format_tag, 251);
    }

    #[tokio::test]
    async fn test_sqlite_upsert_replaces_on_reselection() {
        let store = sqlite_store().await;
        let track = TrackId::from("t1");

        store.put(&track, &descriptor(251)).await.unwrap();
        store.put(&track, &descriptor(140)).await.unwrap();

        let loaded = store.get(&track).await.unwrap().unwrap();
        assert_eq!(loaded.format_tag, 140);
    }

    #[tokio::test]
    async fn test_null_columns_round_trip() {
        let store = sqlite_store().await;
        let track = TrackId::from("t1");
        let mut encoding = descriptor(140);
        encoding.sample_rate_hz = None;
        encoding.content_length = None;
        encoding.loudness_db = None;

        store.put(&track, &encoding).await.unwrap();

        let loaded = store.get(&track).await.unwrap().unwrap();
        assert_eq!(loaded.sample_rate_hz, None);
        assert_eq!(loaded.content_length, None);
        assert_eq!(loaded.loudness_db, None);
    }
}
