//! # Download Module
//!
//! Background download jobs and the authoritative job-state map.
//!
//! ## Overview
//!
//! - **Job State Machine** (`job`): `DownloadJob` lifecycle with validated
//!   transitions (`Queued → Downloading → {Completed, Failed}`, removal via
//!   `Removing`, failed jobs re-enqueueable)
//! - **Job Tracker** (`tracker`): single source of truth for job state —
//!   seeded once from the persisted index, updated by executor notifications,
//!   published as immutable copy-on-write snapshots, observable per track
//! - **Executor** (`executor`): the `DownloadExecutor` collaborator trait plus
//!   a local implementation that streams resolved tracks into the persistent
//!   download cache under a bounded-parallelism semaphore
//! - **Index Repository** (`index`): persisted job index backing the executor
//!   across restarts

pub mod config;
pub mod error;
pub mod executor;
pub mod index;
pub mod job;
pub mod tracker;

pub use config::DownloadConfig;
pub use error::{DownloadError, Result};
pub use executor::{DownloadExecutor, LocalDownloadExecutor};
pub use index::{JobIndexRepository, MemoryJobIndexRepository, SqliteJobIndexRepository};
pub use job::{DownloadJob, JobChange, JobState};
pub use tracker::{DownloadJobTracker, TrackJobEvents};
