use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Download job not found for track {track_id}")]
    JobNotFound { track_id: String },

    #[error("Invalid job state: {0}")]
    InvalidState(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Resolution failed: {0}")]
    Resolution(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Job index error: {0}")]
    Index(String),

    #[error("Download timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid download configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DownloadError>;
