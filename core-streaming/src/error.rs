//! # Streaming Error Types
//!
//! Error taxonomy for the resolution path.

use thiserror::Error;

/// Errors that can occur while resolving a track into a fetchable request.
#[derive(Error, Debug)]
pub enum StreamingError {
    // ========================================================================
    // Terminal playback failures
    // ========================================================================
    /// The metadata service reports the track as not playable. Carries the
    /// remote-provided reason verbatim.
    #[error("Track not playable: {reason}")]
    RemoteUnplayable { reason: String },

    /// The catalog contains no audio encoding at all.
    #[error("No playable audio encoding in catalog")]
    NoPlayableEncoding,

    // ========================================================================
    // Per-attempt failures
    // ========================================================================
    /// The cipher/license collaborator could not produce a direct URL.
    #[error("Stream URL resolution failed: {0}")]
    UrlResolution(String),

    /// The metadata service request failed or returned an unusable payload.
    #[error("Metadata service error: {0}")]
    Metadata(String),

    // ========================================================================
    // Local failures
    // ========================================================================
    /// Local byte-cache access failure. Recovered internally by degrading to
    /// the network path; never fails a resolution on its own.
    #[error("Byte cache error: {0}")]
    CacheIo(String),

    /// Format store read/write failure.
    #[error("Format store error: {0}")]
    Store(String),

    /// Invalid streaming configuration.
    #[error("Invalid streaming configuration: {0}")]
    InvalidConfig(String),
}

impl StreamingError {
    /// Returns `true` when the error is terminal for the item: retrying the
    /// same track will not help until the remote state changes.
    pub fn is_terminal_for_item(&self) -> bool {
        matches!(
            self,
            StreamingError::RemoteUnplayable { .. } | StreamingError::NoPlayableEncoding
        )
    }

    /// Returns `true` when a later playback attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StreamingError::UrlResolution(_)
                | StreamingError::Metadata(_)
                | StreamingError::CacheIo(_)
        )
    }
}

/// Result type for streaming operations.
pub type Result<T> = std::result::Result<T, StreamingError>;
