//! # Download Job State Machine
//!
//! Lifecycle of one background download with validated state transitions.
//!
//! ## State Machine
//!
//! ```text
//! Queued → Downloading → Completed → Removing → (deleted)
//!   ↑          ↓                        ↑
//!   └────── Failed ────────────────────┘
//! ```
//!
//! `Failed` is terminal but re-enqueueable: an explicit re-enqueue moves the
//! job back to `Queued`. `Queued` jobs can also be removed directly.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use core_store::models::TrackId;

use crate::error::{DownloadError, Result};

/// The current state of a download job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Waiting for a download slot.
    Queued,
    /// Actively streaming bytes into the download cache.
    Downloading,
    /// All bytes stored; the track is fully available offline.
    Completed,
    /// The download gave up; see `DownloadJob::last_error`.
    Failed,
    /// Cached bytes and index entry are being deleted.
    Removing,
}

impl JobState {
    /// Check if this state ends the download lifecycle (short of removal or
    /// re-enqueue).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Check if the job still occupies (or waits for) a download slot.
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Queued | JobState::Downloading)
    }

    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Downloading => "downloading",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Removing => "removing",
        }
    }
}

impl FromStr for JobState {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(JobState::Queued),
            "downloading" => Ok(JobState::Downloading),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            "removing" => Ok(JobState::Removing),
            _ => Err(DownloadError::InvalidState(s.to_string())),
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One tracked download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadJob {
    /// Track being downloaded; also the job's identity.
    pub track_id: TrackId,
    /// Current state.
    pub state: JobState,
    /// Format tag the download was requested at, when pinned by the caller.
    pub encoding_hint: Option<i32>,
    /// Bytes stored so far.
    pub bytes_downloaded: u64,
    /// Error message of the last failed attempt.
    pub last_error: Option<String>,
    /// Unix timestamp of job creation.
    pub created_at: i64,
    /// Unix timestamp of the last state change.
    pub updated_at: i64,
}

impl DownloadJob {
    /// Create a new job in `Queued` state.
    pub fn new(track_id: TrackId, encoding_hint: Option<i32>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            track_id,
            state: JobState::Queued,
            encoding_hint,
            bytes_downloaded: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `Downloading`.
    pub fn start(&mut self) -> Result<()> {
        self.transition(JobState::Downloading)
    }

    /// Move to `Completed`.
    pub fn complete(&mut self) -> Result<()> {
        self.transition(JobState::Completed)
    }

    /// Move to `Failed`, capturing the error message.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.transition(JobState::Failed)?;
        self.last_error = Some(error.into());
        Ok(())
    }

    /// Re-enqueue a failed job.
    pub fn requeue(&mut self) -> Result<()> {
        self.transition(JobState::Queued)?;
        self.last_error = None;
        self.bytes_downloaded = 0;
        Ok(())
    }

    /// Begin removal of the job and its cached bytes.
    pub fn begin_removal(&mut self) -> Result<()> {
        self.transition(JobState::Removing)
    }

    /// Update the downloaded byte count.
    pub fn record_progress(&mut self, bytes_downloaded: u64) {
        self.bytes_downloaded = bytes_downloaded;
        self.updated_at = Utc::now().timestamp();
    }

    fn transition(&mut self, to: JobState) -> Result<()> {
        let valid = matches!(
            (self.state, to),
            (JobState::Queued, JobState::Downloading)
                | (JobState::Queued, JobState::Removing)
                | (JobState::Downloading, JobState::Completed)
                | (JobState::Downloading, JobState::Failed)
                | (JobState::Failed, JobState::Queued)
                | (JobState::Failed, JobState::Removing)
                | (JobState::Completed, JobState::Removing)
        );

        if !valid {
            return Err(DownloadError::InvalidStateTransition {
                from: self.state.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.state.as_str(),
                    to.as_str()
                ),
            });
        }

        self.state = to;
        self.updated_at = Utc::now().timestamp();
        Ok(())
    }
}

/// One change notification from the download executor.
///
/// Every notification replaces exactly one entry in the tracker's map; a
/// `Removed` notification ends the entry's lifecycle.
#[derive(Debug, Clone)]
pub enum JobChange {
    Updated(DownloadJob),
    Removed(TrackId),
}

impl JobChange {
    /// Track the change applies to.
    pub fn track_id(&self) -> &TrackId {
        match self {
            JobChange::Updated(job) => &job.track_id,
            JobChange::Removed(track_id) => track_id,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
