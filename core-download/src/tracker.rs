//! Authoritative download job tracking.
//!
//! The tracker owns the only map of track id → job state the rest of the
//! system is allowed to consult. It is seeded once from the executor's
//! persisted index, then kept current by the executor's change notifications.
//! The map is published as immutable snapshots: every change produces a new
//! `Arc<HashMap>` and swaps it in, so readers never observe a half-applied
//! update (and a held snapshot stays internally consistent forever).

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use core_store::models::TrackId;

use crate::error::Result;
use crate::executor::DownloadExecutor;
use crate::job::{DownloadJob, JobChange};

type JobMap = Arc<HashMap<TrackId, DownloadJob>>;

/// Tracks download jobs and exposes them for non-blocking reads and reactive
/// observation.
pub struct DownloadJobTracker {
    executor: Arc<dyn DownloadExecutor>,
    jobs: Arc<RwLock<JobMap>>,
    events: broadcast::Sender<JobChange>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl DownloadJobTracker {
    pub fn new(executor: Arc<dyn DownloadExecutor>) -> Self {
        let (events, _) = broadcast::channel(128);
        Self {
            executor,
            jobs: Arc::new(RwLock::new(Arc::new(HashMap::new()))),
            events,
            listener: Mutex::new(None),
        }
    }

    /// Seed the map from the persisted index and start consuming change
    /// notifications.
    ///
    /// Subscribes before loading the index so no change emitted in between is
    /// lost; a change that races the seed is re-applied idempotently.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let mut notifications = self.executor.subscribe();

        let seeded: HashMap<TrackId, DownloadJob> = self
            .executor
            .load_index()
            .await?
            .into_iter()
            .map(|job| (job.track_id.clone(), job))
            .collect();

        info!(jobs = seeded.len(), "Seeded download job tracker");
        *self.jobs.write() = Arc::new(seeded);

        let jobs = self.jobs.clone();
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            loop {
                match notifications.recv().await {
                    Ok(change) => {
                        Self::apply_change(&jobs, &change);
                        let _ = events.send(change);
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Job notification stream lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Job notification stream closed");
                        break;
                    }
                }
            }
        });

        *self.listener.lock() = Some(handle);
        Ok(())
    }

    /// Replace exactly one entry by publishing a fresh snapshot.
    fn apply_change(jobs: &RwLock<JobMap>, change: &JobChange) {
        let mut guard = jobs.write();
        let mut next: HashMap<TrackId, DownloadJob> = (**guard).clone();

        match change {
            JobChange::Updated(job) => {
                next.insert(job.track_id.clone(), job.clone());
            }
            JobChange::Removed(track_id) => {
                next.remove(track_id);
            }
        }

        *guard = Arc::new(next);
    }

    /// Non-blocking point-in-time read of one job.
    pub fn current(&self, track_id: &TrackId) -> Option<DownloadJob> {
        self.jobs.read().get(track_id).cloned()
    }

    /// Non-blocking snapshot of the whole map. The snapshot is immutable;
    /// later changes are only visible through a new snapshot.
    pub fn snapshot(&self) -> JobMap {
        self.jobs.read().clone()
    }

    /// Observe every change affecting one track, in order.
    pub fn subscribe(&self, track_id: &TrackId) -> TrackJobEvents {
        TrackJobEvents {
            track_id: track_id.clone(),
            receiver: self.events.subscribe(),
        }
    }

    /// Request a download for a track.
    pub async fn enqueue(&self, track_id: TrackId, encoding_hint: Option<i32>) -> Result<()> {
        self.executor.enqueue(track_id, encoding_hint).await
    }

    /// Remove a track's download and its cached bytes.
    pub async fn remove(&self, track_id: TrackId) -> Result<()> {
        self.executor.remove(track_id).await
    }

    /// The executor's parallel-download bound.
    pub fn max_parallel_downloads(&self) -> usize {
        self.executor.max_parallel_downloads()
    }

    /// Stop consuming notifications.
    pub fn stop(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for DownloadJobTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ordered stream of changes for a single track.
///
/// Backed by a broadcast subscription; a slow consumer may observe a lag
/// error but never a reordered or partially applied change.
pub struct TrackJobEvents {
    track_id: TrackId,
    receiver: broadcast::Receiver<JobChange>,
}

impl TrackJobEvents {
    /// Receive the next change for the subscribed track, skipping changes for
    /// other tracks.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged` when the consumer fell behind and
    /// `RecvError::Closed` when the tracker stopped.
    pub async fn recv(&mut self) -> std::result::Result<JobChange, RecvError> {
        loop {
            let change = self.receiver.recv().await?;
            if change.track_id() == &self.track_id {
                return Ok(change);
            }
        }
    }
}
