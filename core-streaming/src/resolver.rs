//! Direct stream URL resolution.
//!
//! Turns a chosen encoding into a directly fetchable, time-limited URL. The
//! cipher/license step is delegated to an external collaborator; this module
//! only orchestrates it and applies the anti-throttling range hint.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use core_store::models::TrackId;
use tracing::instrument;

use crate::encoding::EncodingDescriptor;
use crate::error::{Result, StreamingError};

/// Errors from the external cipher/license collaborator.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("Unrecognized cipher scheme: {0}")]
    UnrecognizedScheme(String),

    #[error("Cipher resolution unavailable: {0}")]
    Unavailable(String),
}

/// External collaborator that resolves an encoding's protected location into
/// a plain fetchable URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CipherResolver: Send + Sync {
    async fn resolve_url(
        &self,
        encoding: &EncodingDescriptor,
        track_id: &TrackId,
    ) -> std::result::Result<String, CipherError>;
}

/// A resolved, directly fetchable location.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub url: String,
    /// How long the URL stays valid, measured from resolution time.
    pub ttl: Duration,
}

/// Resolves encodings into time-limited direct URLs.
pub struct UrlResolver {
    cipher: Arc<dyn CipherResolver>,
    default_range_end: u64,
}

impl UrlResolver {
    pub fn new(cipher: Arc<dyn CipherResolver>, default_range_end: u64) -> Self {
        Self {
            cipher,
            default_range_end,
        }
    }

    /// Resolve `encoding` into a fetchable URL.
    ///
    /// A `range=0-N` query parameter is appended: unranged long-lived
    /// connections trigger server-side throttling. `N` is the encoding's
    /// content length when known, otherwise the configured fallback.
    ///
    /// `expires_in` comes from the manifest that listed the encoding and is
    /// passed through as the TTL, applied relative to now by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`StreamingError::UrlResolution`] when the collaborator cannot
    /// produce a URL.
    #[instrument(skip(self, encoding), fields(track_id = %track_id, format_tag = encoding.format_tag))]
    pub async fn resolve(
        &self,
        encoding: &EncodingDescriptor,
        track_id: &TrackId,
        expires_in: Duration,
    ) -> Result<ResolvedTarget> {
        let base = self
            .cipher
            .resolve_url(encoding, track_id)
            .await
            .map_err(|e| StreamingError::UrlResolution(e.to_string()))?;

        let range_end = encoding.content_length.unwrap_or(self.default_range_end);
        let separator = if base.contains('?') { '&' } else { '?' };
        let url = format!("{}{}range=0-{}", base, separator, range_end);

        Ok(ResolvedTarget {
            url,
            ttl: expires_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoding(content_length: Option<u64>) -> EncodingDescriptor {
        EncodingDescriptor {
            format_tag: 251,
            mime_type: "audio/webm".to_string(),
            codec: "opus".to_string(),
            bitrate_bps: 160_000,
            sample_rate_hz: Some(48_000),
            content_length,
            loudness_db: None,
        }
    }

    #[tokio::test]
    async fn test_range_hint_uses_content_length() {
        let mut cipher = MockCipherResolver::new();
        cipher
            .expect_resolve_url()
            .returning(|_, _| Ok("https://edge.example.com/v?sig=abc".to_string()));

        let resolver = UrlResolver::new(Arc::new(cipher), 10_000_000);
        let target = resolver
            .resolve(
                &encoding(Some(4_321_000)),
                &TrackId::from("t"),
                Duration::from_secs(100),
            )
            .await
            .unwrap();

        assert_eq!(target.url, "https://edge.example.com/v?sig=abc&range=0-4321000");
        assert_eq!(target.ttl, Duration::from_secs(100));
    }

    #[tokio::test]
    async fn test_range_hint_falls_back_when_length_unknown() {
        let mut cipher = MockCipherResolver::new();
        cipher
            .expect_resolve_url()
            .returning(|_, _| Ok("https://edge.example.com/v?sig=abc".to_string()));

        let resolver = UrlResolver::new(Arc::new(cipher), 10_000_000);
        let target = resolver
            .resolve(&encoding(None), &TrackId::from("t"), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(target.url.ends_with("&range=0-10000000"));
    }

    #[tokio::test]
    async fn test_range_hint_starts_query_when_absent() {
        let mut cipher = MockCipherResolver::new();
        cipher
            .expect_resolve_url()
            .returning(|_, _| Ok("https://edge.example.com/plain".to_string()));

        let resolver = UrlResolver::new(Arc::new(cipher), 10_000_000);
        let target = resolver
            .resolve(&encoding(None), &TrackId::from("t"), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(target.url.ends_with("/plain?range=0-10000000"));
    }

    #[tokio::test]
    async fn test_cipher_failure_maps_to_url_resolution() {
        let mut cipher = MockCipherResolver::new();
        cipher.expect_resolve_url().returning(|_, _| {
            Err(CipherError::UnrecognizedScheme("sig v9".to_string()))
        });

        let resolver = UrlResolver::new(Arc::new(cipher), 10_000_000);
        let err = resolver
            .resolve(&encoding(None), &TrackId::from("t"), Duration::from_secs(1))
            .await
            .unwrap_err();

        match err {
            StreamingError::UrlResolution(message) => assert!(message.contains("sig v9")),
            other => panic!("expected UrlResolution, got {:?}", other),
        }
    }
}
