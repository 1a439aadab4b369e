//! Streaming configuration.

use std::time::Duration;

use crate::error::{Result, StreamingError};
use crate::selector::StreamQuality;

/// Fallback upper bound for the byte-range hint when the catalog does not
/// report a content length.
const DEFAULT_RANGE_END: u64 = 10_000_000;

/// Configuration for the stream resolution engine.
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// Base URL of the remote metadata service.
    pub metadata_base_url: String,

    /// Client name sent to the metadata service.
    pub client_name: String,

    /// Client version sent to the metadata service.
    pub client_version: String,

    /// Quality policy applied when selecting a fresh encoding.
    pub quality: StreamQuality,

    /// Range-hint upper bound used when content length is unknown.
    pub default_range_end: u64,

    /// Timeout for metadata requests.
    pub request_timeout: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            metadata_base_url: String::new(),
            client_name: "smc".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            quality: StreamQuality::default(),
            default_range_end: DEFAULT_RANGE_END,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl StreamingConfig {
    /// Create a configuration pointing at the given metadata service.
    pub fn new(metadata_base_url: impl Into<String>) -> Self {
        Self {
            metadata_base_url: metadata_base_url.into(),
            ..Self::default()
        }
    }

    /// Set the quality policy.
    pub fn with_quality(mut self, quality: StreamQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Set the client identification sent to the metadata service.
    pub fn with_client(
        mut self,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.client_name = name.into();
        self.client_version = version.into();
        self
    }

    /// Set the range-hint upper bound used when content length is unknown.
    pub fn with_default_range_end(mut self, range_end: u64) -> Self {
        self.default_range_end = range_end;
        self
    }

    /// Set the metadata request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StreamingError::InvalidConfig`] with an actionable message
    /// when a field is unusable.
    pub fn validate(&self) -> Result<()> {
        if self.metadata_base_url.is_empty() {
            return Err(StreamingError::InvalidConfig(
                "Metadata base URL is required. Use StreamingConfig::new() to set it.".to_string(),
            ));
        }

        if !self.metadata_base_url.starts_with("http") {
            return Err(StreamingError::InvalidConfig(format!(
                "Metadata base URL must be an http(s) URL, got '{}'",
                self.metadata_base_url
            )));
        }

        if self.client_name.is_empty() {
            return Err(StreamingError::InvalidConfig(
                "Client name cannot be empty".to_string(),
            ));
        }

        if self.default_range_end == 0 {
            return Err(StreamingError::InvalidConfig(
                "default_range_end must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(StreamingError::InvalidConfig(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = StreamingConfig::new("https://media.example.com/api");
        assert_eq!(config.quality, StreamQuality::Auto);
        assert_eq!(config.default_range_end, 10_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_base_url_rejected() {
        let config = StreamingConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("base URL"));
    }

    #[test]
    fn test_non_http_base_url_rejected() {
        let config = StreamingConfig::new("ftp://media.example.com");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder() {
        let config = StreamingConfig::new("https://media.example.com/api")
            .with_quality(StreamQuality::Max)
            .with_client("player-desktop", "2.1.0")
            .with_default_range_end(5_000_000)
            .with_request_timeout(Duration::from_secs(10));

        assert_eq!(config.quality, StreamQuality::Max);
        assert_eq!(config.client_name, "player-desktop");
        assert_eq!(config.default_range_end, 5_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_range_end_rejected() {
        let config = StreamingConfig::new("https://media.example.com").with_default_range_end(0);
        assert!(config.validate().is_err());
    }
}
