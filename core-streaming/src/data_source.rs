//! Stream data source: the per-request resolution orchestrator.
//!
//! The player asks for bytes as `(track id, offset, length)`; this module
//! answers with a request the cache-aware transport can actually execute,
//! preferring local bytes over a cached URL over full network resolution.

use std::sync::Arc;

use bridge_traits::cache::ByteRangeCache;
use bridge_traits::network::NetworkMonitor;
use core_store::models::TrackId;
use tracing::{debug, info, instrument, warn};

use crate::catalog::FormatCatalog;
use crate::config::StreamingConfig;
use crate::error::{Result, StreamingError};
use crate::format_store::FormatStore;
use crate::resolver::UrlResolver;
use crate::selector::select_encoding;
use crate::url_cache::ResolvedUrlCache;

/// One byte-range request on its way to the transport.
///
/// `url == None` means the transport should serve the span from the local
/// byte caches; a rewritten request carries the direct URL to fetch from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub track_id: TrackId,
    pub offset: u64,
    /// Requested span length; `None` for open-ended reads.
    pub length: Option<u64>,
    pub url: Option<String>,
}

impl StreamRequest {
    pub fn new(track_id: TrackId, offset: u64, length: Option<u64>) -> Self {
        Self {
            track_id,
            offset,
            length,
            url: None,
        }
    }

    /// Rewrite the request to point at a resolved URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Whether the request already names a network location.
    pub fn is_resolved(&self) -> bool {
        self.url.is_some()
    }

    /// Span length used when probing the byte caches. Open-ended reads probe
    /// a single byte: if even that is missing, the span is not locally
    /// serveable anyway.
    fn probe_length(&self) -> u64 {
        self.length.unwrap_or(1)
    }
}

/// Resolves byte-range requests against the local caches and, when needed,
/// the remote metadata service.
///
/// Resolution may suspend on network and storage I/O; callers invoke it from
/// a worker task, never from the thread driving audio output. Concurrent
/// resolutions for the same track are tolerated (both produce valid URLs;
/// the URL cache keeps the last writer).
pub struct StreamDataSource {
    config: StreamingConfig,
    catalog: FormatCatalog,
    resolver: UrlResolver,
    format_store: Arc<dyn FormatStore>,
    url_cache: Arc<ResolvedUrlCache>,
    playback_cache: Arc<dyn ByteRangeCache>,
    download_cache: Arc<dyn ByteRangeCache>,
    network: Arc<dyn NetworkMonitor>,
}

impl StreamDataSource {
    /// Wire up a data source.
    ///
    /// # Errors
    ///
    /// Fails fast with [`StreamingError::InvalidConfig`] when the
    /// configuration is unusable.
    ///
    /// [`StreamingError::InvalidConfig`]: crate::error::StreamingError::InvalidConfig
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: StreamingConfig,
        catalog: FormatCatalog,
        resolver: UrlResolver,
        format_store: Arc<dyn FormatStore>,
        url_cache: Arc<ResolvedUrlCache>,
        playback_cache: Arc<dyn ByteRangeCache>,
        download_cache: Arc<dyn ByteRangeCache>,
        network: Arc<dyn NetworkMonitor>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            catalog,
            resolver,
            format_store,
            url_cache,
            playback_cache,
            download_cache,
            network,
        })
    }

    /// Resolve a byte-range request.
    ///
    /// Order of preference:
    /// 1. Span already present in the download or playback cache — the
    ///    request is returned unchanged for a pure local fetch.
    /// 2. A still-valid resolved URL — the request is rewritten to it.
    /// 3. Full resolution: persisted format lookup → catalog fetch →
    ///    selection (skipped when a prior format matches) → cipher/URL
    ///    resolution → URL cache fill.
    ///
    /// A failing byte-cache probe is logged and degraded to the network
    /// path; it never fails the request on its own. Catalog, selection and
    /// URL-resolution errors propagate to the caller, and an expired URL is
    /// never served.
    #[instrument(skip(self, request), fields(track_id = %request.track_id, offset = request.offset))]
    pub async fn resolve(&self, request: StreamRequest) -> Result<StreamRequest> {
        let key = request.track_id.as_str();
        let probe_length = request.probe_length();

        match self
            .probe_cache(&*self.download_cache, key, request.offset, probe_length)
            .await
        {
            Ok(true) => {
                debug!("Serving from download cache");
                return Ok(request);
            }
            Ok(false) => {}
            // degrade to the network path
            Err(e) => warn!(tier = "download", "Byte cache probe failed: {}", e),
        }

        match self
            .probe_cache(&*self.playback_cache, key, request.offset, probe_length)
            .await
        {
            Ok(true) => {
                debug!("Serving from playback cache");
                return Ok(request);
            }
            Ok(false) => {}
            Err(e) => warn!(tier = "playback", "Byte cache probe failed: {}", e),
        }

        if let Some(entry) = self.url_cache.get(&request.track_id) {
            debug!("Reusing cached stream URL");
            return Ok(request.with_url(entry.url));
        }

        self.resolve_remote(request).await
    }

    async fn probe_cache(
        &self,
        cache: &dyn ByteRangeCache,
        key: &str,
        offset: u64,
        probe_length: u64,
    ) -> Result<bool> {
        cache
            .is_cached(key, offset, probe_length)
            .await
            .map_err(|e| StreamingError::CacheIo(e.to_string()))
    }

    /// Full resolution against the remote metadata service.
    ///
    /// Shared caches are only written after every fallible step has
    /// succeeded, so an abandoned (dropped) resolution leaves no partial
    /// state behind.
    async fn resolve_remote(&self, request: StreamRequest) -> Result<StreamRequest> {
        let prior = match self.format_store.get(&request.track_id).await {
            Ok(prior) => prior,
            Err(e) => {
                warn!("Format store read failed, selecting fresh: {}", e);
                None
            }
        };
        let prior_tag = prior.map(|encoding| encoding.format_tag);

        let manifest = self.catalog.fetch(&request.track_id).await?;

        let metered = self.network.is_metered().await;
        let encoding = select_encoding(
            &manifest.encodings,
            prior_tag,
            self.config.quality,
            metered,
        )?
        .clone();

        if let Err(e) = self.format_store.put(&request.track_id, &encoding).await {
            // metadata persistence must not take down playback
            warn!("Failed to persist chosen encoding: {}", e);
        }

        let target = self
            .resolver
            .resolve(&encoding, &request.track_id, manifest.expires_in)
            .await?;

        self.url_cache
            .insert(request.track_id.clone(), target.url.clone(), target.ttl);

        info!(
            format_tag = encoding.format_tag,
            mime_type = %encoding.mime_type,
            ttl_secs = target.ttl.as_secs(),
            "Resolved stream URL"
        );

        Ok(request.with_url(target.url))
    }
}
