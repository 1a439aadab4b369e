//! Remote format catalog client.
//!
//! Queries the metadata service for the set of encodings available for a
//! track and its playability status. The result is never cached here — the
//! caller owns freshness policy, because the manifest also carries the URL
//! expiry window that must be measured from resolution time.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::http::{HttpClient, HttpRequest};
use core_store::models::TrackId;
use tracing::{debug, instrument, warn};

use crate::config::StreamingConfig;
use crate::encoding::{parse_mime, EncodingDescriptor};
use crate::error::{Result, StreamingError};

/// Everything the resolution path needs from one catalog fetch.
#[derive(Debug, Clone)]
pub struct TrackManifest {
    /// All adaptive encodings offered for the track (audio and video).
    pub encodings: Vec<EncodingDescriptor>,
    /// How long direct URLs minted against this manifest stay valid.
    pub expires_in: Duration,
    /// Track-level loudness, when reported.
    pub loudness_db: Option<f32>,
}

// ============================================================================
// Wire DTOs
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerRequestBody<'a> {
    track_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: PlayabilityStatusDto,
    #[serde(default)]
    streaming_data: Option<StreamingDataDto>,
    #[serde(default)]
    player_config: Option<PlayerConfigDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayabilityStatusDto {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingDataDto {
    #[serde(default)]
    adaptive_formats: Vec<AdaptiveFormatDto>,
    expires_in_seconds: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdaptiveFormatDto {
    itag: i32,
    mime_type: String,
    bitrate: i64,
    #[serde(default)]
    audio_sample_rate: Option<u32>,
    #[serde(default)]
    content_length: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerConfigDto {
    #[serde(default)]
    audio_config: Option<AudioConfigDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfigDto {
    #[serde(default)]
    loudness_db: Option<f32>,
}

// ============================================================================
// Client
// ============================================================================

/// Client for the remote metadata service's player endpoint.
pub struct FormatCatalog {
    http: Arc<dyn HttpClient>,
    base_url: String,
    client_name: String,
    client_version: String,
    request_timeout: Duration,
}

impl FormatCatalog {
    pub fn new(http: Arc<dyn HttpClient>, config: &StreamingConfig) -> Self {
        Self {
            http,
            base_url: config.metadata_base_url.clone(),
            client_name: config.client_name.clone(),
            client_version: config.client_version.clone(),
            request_timeout: config.request_timeout,
        }
    }

    /// Fetch playability and the encoding set for a track.
    ///
    /// # Errors
    ///
    /// - [`StreamingError::RemoteUnplayable`] when the service reports a
    ///   non-OK playability status; the remote reason string is carried
    ///   verbatim
    /// - [`StreamingError::Metadata`] for transport failures, HTTP error
    ///   statuses and malformed payloads
    #[instrument(skip(self), fields(track_id = %track_id))]
    pub async fn fetch(&self, track_id: &TrackId) -> Result<TrackManifest> {
        let body = PlayerRequestBody {
            track_id: track_id.as_str(),
        };

        let request = HttpRequest::post(format!("{}/player", self.base_url))
            .header("X-Client-Name", &self.client_name)
            .header("X-Client-Version", &self.client_version)
            .json(&body)
            .map_err(|e| StreamingError::Metadata(e.to_string()))?
            .timeout(self.request_timeout);

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| StreamingError::Metadata(format!("Player request failed: {}", e)))?;

        if !response.is_success() {
            warn!(status = response.status, "Player endpoint returned an error status");
            return Err(StreamingError::Metadata(format!(
                "Player endpoint returned HTTP {}",
                response.status
            )));
        }

        let payload: PlayerResponse = response
            .json()
            .map_err(|e| StreamingError::Metadata(format!("Malformed player response: {}", e)))?;

        if payload.playability_status.status != "OK" {
            let reason = payload
                .playability_status
                .reason
                .unwrap_or(payload.playability_status.status);
            return Err(StreamingError::RemoteUnplayable { reason });
        }

        let streaming_data = payload.streaming_data.ok_or_else(|| {
            StreamingError::Metadata("Playable response is missing streamingData".to_string())
        })?;

        let loudness_db = payload
            .player_config
            .and_then(|c| c.audio_config)
            .and_then(|a| a.loudness_db);

        let encodings: Vec<EncodingDescriptor> = streaming_data
            .adaptive_formats
            .into_iter()
            .map(|format| {
                let (mime_type, codec) = parse_mime(&format.mime_type);
                EncodingDescriptor {
                    format_tag: format.itag,
                    mime_type,
                    codec,
                    bitrate_bps: format.bitrate,
                    sample_rate_hz: format.audio_sample_rate,
                    content_length: format.content_length,
                    loudness_db,
                }
            })
            .collect();

        debug!(
            encodings = encodings.len(),
            expires_in_seconds = streaming_data.expires_in_seconds,
            "Fetched track manifest"
        );

        Ok(TrackManifest {
            encodings,
            expires_in: Duration::from_secs(streaming_data.expires_in_seconds),
            loudness_db,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedHttp {
        status: u16,
        body: serde_json::Value,
        calls: AtomicUsize,
    }

    impl CannedHttp {
        fn new(status: u16, body: serde_json::Value) -> Self {
            Self {
                status,
                body,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HttpClient for CannedHttp {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse {
                status: self.status,
                headers: HashMap::new(),
                body: Bytes::from(serde_json::to_vec(&self.body).unwrap()),
            })
        }

        async fn download_stream(
            &self,
            _url: String,
        ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
            Err(BridgeError::NotAvailable("not used in tests".to_string()))
        }
    }

    fn catalog(http: Arc<dyn HttpClient>) -> FormatCatalog {
        let config = StreamingConfig::new("https://media.example.com/api");
        FormatCatalog::new(http, &config)
    }

    fn playable_body() -> serde_json::Value {
        serde_json::json!({
            "playabilityStatus": { "status": "OK" },
            "streamingData": {
                "adaptiveFormats": [
                    {
                        "itag": 140,
                        "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"",
                        "bitrate": 128000,
                        "audioSampleRate": 44100,
                        "contentLength": 4000000
                    },
                    {
                        "itag": 251,
                        "mimeType": "audio/webm; codecs=\"opus\"",
                        "bitrate": 160000,
                        "audioSampleRate": 48000
                    }
                ],
                "expiresInSeconds": 21540
            },
            "playerConfig": {
                "audioConfig": { "loudnessDb": -4.5 }
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_playable_manifest() {
        let http = Arc::new(CannedHttp::new(200, playable_body()));
        let manifest = catalog(http.clone())
            .fetch(&TrackId::from("track-1"))
            .await
            .unwrap();

        assert_eq!(manifest.encodings.len(), 2);
        assert_eq!(manifest.expires_in, Duration::from_secs(21540));
        assert_eq!(manifest.loudness_db, Some(-4.5));

        let opus = &manifest.encodings[1];
        assert_eq!(opus.format_tag, 251);
        assert_eq!(opus.mime_type, "audio/webm");
        assert_eq!(opus.codec, "opus");
        assert_eq!(opus.content_length, None);
        assert_eq!(opus.loudness_db, Some(-4.5));
        assert_eq!(http.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_unplayable_carries_reason() {
        let body = serde_json::json!({
            "playabilityStatus": {
                "status": "LOGIN_REQUIRED",
                "reason": "Sign in to confirm your age"
            }
        });
        let http = Arc::new(CannedHttp::new(200, body));

        let err = catalog(http)
            .fetch(&TrackId::from("track-2"))
            .await
            .unwrap_err();

        match err {
            StreamingError::RemoteUnplayable { reason } => {
                assert_eq!(reason, "Sign in to confirm your age");
            }
            other => panic!("expected RemoteUnplayable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_unplayable_without_reason_uses_status() {
        let body = serde_json::json!({
            "playabilityStatus": { "status": "UNPLAYABLE" }
        });
        let http = Arc::new(CannedHttp::new(200, body));

        let err = catalog(http)
            .fetch(&TrackId::from("track-3"))
            .await
            .unwrap_err();

        match err {
            StreamingError::RemoteUnplayable { reason } => assert_eq!(reason, "UNPLAYABLE"),
            other => panic!("expected RemoteUnplayable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let http = Arc::new(CannedHttp::new(503, serde_json::json!({})));

        let err = catalog(http)
            .fetch(&TrackId::from("track-4"))
            .await
            .unwrap_err();

        assert!(matches!(err, StreamingError::Metadata(_)));
    }

    #[tokio::test]
    async fn test_fetch_playable_without_streaming_data() {
        let body = serde_json::json!({
            "playabilityStatus": { "status": "OK" }
        });
        let http = Arc::new(CannedHttp::new(200, body));

        let err = catalog(http)
            .fetch(&TrackId::from("track-5"))
            .await
            .unwrap_err();

        assert!(matches!(err, StreamingError::Metadata(_)));
    }
}
