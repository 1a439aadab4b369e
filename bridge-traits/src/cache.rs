//! Byte-Range Cache Abstraction
//!
//! Local storage of previously fetched media byte spans, keyed by an opaque
//! track key. The core wires two independent instances: an ephemeral playback
//! cache (filled by the transport as the player streams) and a persistent
//! download cache (filled by the download executor). Eviction is owned by the
//! implementation; the core only probes, reads and writes.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Byte-range cache capability.
///
/// Implementations must tolerate sparse content: spans may be written out of
/// order and `is_cached` must only report `true` when the full requested span
/// is present.
#[async_trait]
pub trait ByteRangeCache: Send + Sync {
    /// Check whether the full span `[offset, offset + length)` is stored.
    async fn is_cached(&self, key: &str, offset: u64, length: u64) -> Result<bool>;

    /// Total number of contiguously cached bytes from position 0.
    async fn cached_length(&self, key: &str) -> Result<u64>;

    /// Read a fully cached span.
    ///
    /// # Errors
    ///
    /// Returns an error if any part of the span is missing.
    async fn read(&self, key: &str, offset: u64, length: u64) -> Result<Bytes>;

    /// Store a span at the given offset, overwriting any overlap.
    async fn write(&self, key: &str, offset: u64, data: Bytes) -> Result<()>;

    /// Drop all spans stored for a key.
    async fn remove(&self, key: &str) -> Result<()>;
}
