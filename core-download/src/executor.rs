//! Download execution.
//!
//! [`DownloadExecutor`] is the collaborator surface the tracker talks to;
//! [`LocalDownloadExecutor`] is the in-process implementation that resolves
//! tracks through the streaming data source and streams their bytes into the
//! persistent download cache, bounded by a semaphore.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::{broadcast, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use bridge_traits::cache::ByteRangeCache;
use bridge_traits::http::HttpClient;
use core_store::models::TrackId;
use core_streaming::{StreamDataSource, StreamRequest};

use crate::config::DownloadConfig;
use crate::error::{DownloadError, Result};
use crate::index::JobIndexRepository;
use crate::job::{DownloadJob, JobChange, JobState};

/// Download executor collaborator.
///
/// The tracker observes jobs exclusively through [`load_index`] (once, at
/// startup) and the [`subscribe`] notification stream; it never reads
/// executor internals.
///
/// [`load_index`]: DownloadExecutor::load_index
/// [`subscribe`]: DownloadExecutor::subscribe
#[async_trait]
pub trait DownloadExecutor: Send + Sync {
    /// Snapshot of every known job.
    async fn load_index(&self) -> Result<Vec<DownloadJob>>;

    /// Subscribe to job-change notifications.
    fn subscribe(&self) -> broadcast::Receiver<JobChange>;

    /// Request a download. Queues a new job, re-enqueues a failed one, and is
    /// a no-op for a job that is already queued, running or completed.
    async fn enqueue(&self, track_id: TrackId, encoding_hint: Option<i32>) -> Result<()>;

    /// Remove a job and its cached bytes.
    async fn remove(&self, track_id: TrackId) -> Result<()>;

    /// The enforced parallel-download bound.
    fn max_parallel_downloads(&self) -> usize;
}

// ============================================================================
// Local executor
// ============================================================================

struct ExecutorInner {
    config: DownloadConfig,
    index: Arc<dyn JobIndexRepository>,
    data_source: Arc<StreamDataSource>,
    http: Arc<dyn HttpClient>,
    download_cache: Arc<dyn ByteRangeCache>,
    jobs: RwLock<HashMap<TrackId, DownloadJob>>,
    permits: Arc<Semaphore>,
    events: broadcast::Sender<JobChange>,
}

impl ExecutorInner {
    fn current(&self, track_id: &TrackId) -> Option<DownloadJob> {
        self.jobs.read().get(track_id).cloned()
    }

    /// Apply a validated mutation to a tracked job and return the new value.
    fn mutate(
        &self,
        track_id: &TrackId,
        f: impl FnOnce(&mut DownloadJob) -> Result<()>,
    ) -> Result<DownloadJob> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(track_id)
            .ok_or_else(|| DownloadError::JobNotFound {
                track_id: track_id.to_string(),
            })?;
        f(job)?;
        Ok(job.clone())
    }

    /// Persist a job's state and notify subscribers.
    ///
    /// Index failures are logged, not raised: the in-memory map stays
    /// authoritative and job errors reach consumers as state, never as a
    /// broken notification stream.
    async fn persist_and_notify(&self, job: DownloadJob) {
        if let Err(e) = self.index.upsert(&job).await {
            warn!(track_id = %job.track_id, "Failed to persist job state: {}", e);
        }
        let _ = self.events.send(JobChange::Updated(job));
    }
}

/// In-process download executor.
///
/// Workers acquire a semaphore permit before moving a job to `Downloading`,
/// so at most `max_parallel_downloads` downloads run at once and everything
/// else stays `Queued`.
pub struct LocalDownloadExecutor {
    inner: Arc<ExecutorInner>,
}

impl LocalDownloadExecutor {
    /// Wire up an executor.
    ///
    /// # Errors
    ///
    /// Fails fast on an invalid [`DownloadConfig`].
    pub fn new(
        config: DownloadConfig,
        index: Arc<dyn JobIndexRepository>,
        data_source: Arc<StreamDataSource>,
        http: Arc<dyn HttpClient>,
        download_cache: Arc<dyn ByteRangeCache>,
    ) -> Result<Self> {
        config.validate()?;

        let (events, _) = broadcast::channel(config.event_buffer_size);
        let permits = Arc::new(Semaphore::new(config.max_parallel_downloads));

        Ok(Self {
            inner: Arc::new(ExecutorInner {
                config,
                index,
                data_source,
                http,
                download_cache,
                jobs: RwLock::new(HashMap::new()),
                permits,
                events,
            }),
        })
    }

    /// Load the persisted job index and seed the in-memory map.
    ///
    /// Jobs left `Downloading` by a crashed process are demoted to `Queued`
    /// so the host can re-enqueue them without an invalid transition; nothing
    /// is auto-resumed.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        self.inner.index.initialize().await?;

        let mut loaded = self.inner.index.load_all().await?;

        for job in &mut loaded {
            if job.state == JobState::Downloading {
                debug!(track_id = %job.track_id, "Demoting interrupted download to queued");
                job.state = JobState::Queued;
                self.inner.index.upsert(job).await?;
            }
        }

        info!(jobs = loaded.len(), "Seeded download job index");

        let mut jobs = self.inner.jobs.write();
        for job in loaded {
            jobs.insert(job.track_id.clone(), job);
        }

        Ok(())
    }
}

#[async_trait]
impl DownloadExecutor for LocalDownloadExecutor {
    async fn load_index(&self) -> Result<Vec<DownloadJob>> {
        Ok(self.inner.jobs.read().values().cloned().collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<JobChange> {
        self.inner.events.subscribe()
    }

    #[instrument(skip(self), fields(track_id = %track_id))]
    async fn enqueue(&self, track_id: TrackId, encoding_hint: Option<i32>) -> Result<()> {
        match self.inner.current(&track_id) {
            Some(job) if job.state == JobState::Failed => {
                debug!("Re-enqueueing failed download");
                let job = self.inner.mutate(&track_id, |j| j.requeue())?;
                self.inner.persist_and_notify(job).await;
            }
            Some(job) => {
                debug!(state = %job.state, "Download already tracked, ignoring enqueue");
                return Ok(());
            }
            None => {
                let job = DownloadJob::new(track_id.clone(), encoding_hint);
                self.inner
                    .jobs
                    .write()
                    .insert(track_id.clone(), job.clone());
                self.inner.persist_and_notify(job).await;
            }
        }

        let inner = self.inner.clone();
        let id = track_id.clone();
        tokio::spawn(async move {
            run_download(inner, id).await;
        });

        Ok(())
    }

    #[instrument(skip(self), fields(track_id = %track_id))]
    async fn remove(&self, track_id: TrackId) -> Result<()> {
        let job = self.inner.mutate(&track_id, |j| j.begin_removal())?;
        self.inner.persist_and_notify(job).await;

        if let Err(e) = self.inner.download_cache.remove(track_id.as_str()).await {
            warn!("Failed to purge cached bytes: {}", e);
        }

        if let Err(e) = self.inner.index.delete(&track_id).await {
            warn!("Failed to delete job index row: {}", e);
        }

        self.inner.jobs.write().remove(&track_id);
        let _ = self.inner.events.send(JobChange::Removed(track_id));

        Ok(())
    }

    fn max_parallel_downloads(&self) -> usize {
        self.inner.config.max_parallel_downloads
    }
}

// ============================================================================
// Worker
// ============================================================================

async fn run_download(inner: Arc<ExecutorInner>, track_id: TrackId) {
    let permit = match inner.permits.clone().acquire_owned().await {
        Ok(permit) => permit,
        // semaphore closed means the process is shutting down
        Err(_) => return,
    };

    // the job may have been removed (or re-removed) while waiting for a slot
    match inner.mutate(&track_id, |job| job.start()) {
        Ok(job) => inner.persist_and_notify(job).await,
        Err(e) => {
            debug!(track_id = %track_id, "Skipping download: {}", e);
            return;
        }
    }

    let result = download_with_retry(&inner, &track_id).await;
    drop(permit);

    match result {
        Ok(bytes_downloaded) => {
            info!(track_id = %track_id, bytes_downloaded, "Download completed");
            if let Ok(job) = inner.mutate(&track_id, |job| {
                job.record_progress(bytes_downloaded);
                job.complete()
            }) {
                inner.persist_and_notify(job).await;
            }
        }
        Err(e) => {
            error!(track_id = %track_id, "Download failed: {}", e);
            if let Ok(job) = inner.mutate(&track_id, |job| job.fail(e.to_string())) {
                inner.persist_and_notify(job).await;
            }
        }
    }
}

async fn download_with_retry(inner: &ExecutorInner, track_id: &TrackId) -> Result<u64> {
    let mut last_error = None;

    for attempt in 1..=inner.config.max_retry_attempts {
        debug!(
            track_id = %track_id,
            attempt,
            max_attempts = inner.config.max_retry_attempts,
            "Download attempt"
        );

        match timeout(
            inner.config.download_timeout,
            download_once(inner, track_id),
        )
        .await
        {
            Ok(Ok(bytes)) => return Ok(bytes),
            Ok(Err(e)) => {
                warn!("Download attempt {} failed: {}", attempt, e);
                last_error = Some(e);
            }
            Err(_) => {
                warn!("Download attempt {} timed out", attempt);
                last_error = Some(DownloadError::Timeout(
                    inner.config.download_timeout.as_secs(),
                ));
            }
        }

        if attempt < inner.config.max_retry_attempts {
            let delay = inner.config.retry_base_delay * 2u32.pow((attempt - 1) as u32);
            tokio::time::sleep(delay).await;
        }
    }

    Err(last_error.unwrap_or_else(|| {
        DownloadError::Transport("Download failed after all retries".to_string())
    }))
}

async fn download_once(inner: &ExecutorInner, track_id: &TrackId) -> Result<u64> {
    let request = StreamRequest::new(track_id.clone(), 0, None);
    let resolved = inner
        .data_source
        .resolve(request)
        .await
        .map_err(|e| DownloadError::Resolution(e.to_string()))?;

    let url = match resolved.url {
        Some(url) => url,
        // no rewrite means the content is already fully cached locally
        None => {
            return inner
                .download_cache
                .cached_length(track_id.as_str())
                .await
                .map_err(|e| DownloadError::Transport(e.to_string()));
        }
    };

    let mut stream = inner
        .http
        .download_stream(url)
        .await
        .map_err(|e| DownloadError::Transport(e.to_string()))?;

    let mut offset = 0u64;
    let mut buffer = vec![0u8; inner.config.chunk_size];

    loop {
        let read = stream
            .read(&mut buffer)
            .await
            .map_err(|e| DownloadError::Transport(e.to_string()))?;
        if read == 0 {
            break;
        }

        inner
            .download_cache
            .write(
                track_id.as_str(),
                offset,
                Bytes::copy_from_slice(&buffer[..read]),
            )
            .await
            .map_err(|e| DownloadError::Transport(e.to_string()))?;

        offset += read as u64;
    }

    Ok(offset)
}
