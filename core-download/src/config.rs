//! Download executor configuration.

use std::time::Duration;

use crate::error::{DownloadError, Result};

/// Configuration for the local download executor.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Maximum number of downloads running at once; jobs beyond the bound
    /// stay queued until a slot frees (default: 3).
    pub max_parallel_downloads: usize,

    /// Retry attempts per download before the job is marked failed
    /// (default: 3).
    pub max_retry_attempts: usize,

    /// Base delay for exponential retry backoff (default: 100ms).
    pub retry_base_delay: Duration,

    /// Timeout for one download attempt (default: 300s).
    pub download_timeout: Duration,

    /// Size of the chunks streamed into the download cache (default: 64KiB).
    pub chunk_size: usize,

    /// Buffer size of the job-change notification channel (default: 128).
    pub event_buffer_size: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_parallel_downloads: 3,
            max_retry_attempts: 3,
            retry_base_delay: Duration::from_millis(100),
            download_timeout: Duration::from_secs(300),
            chunk_size: 64 * 1024,
            event_buffer_size: 128,
        }
    }
}

impl DownloadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parallel-download bound.
    pub fn with_max_parallel_downloads(mut self, count: usize) -> Self {
        self.max_parallel_downloads = count;
        self
    }

    /// Set the retry attempt count.
    pub fn with_max_retry_attempts(mut self, attempts: usize) -> Self {
        self.max_retry_attempts = attempts;
        self
    }

    /// Set the base retry backoff delay.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Set the per-attempt download timeout.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel_downloads == 0 {
            return Err(DownloadError::InvalidConfig(
                "max_parallel_downloads must be at least 1".to_string(),
            ));
        }

        if self.max_retry_attempts == 0 {
            return Err(DownloadError::InvalidConfig(
                "max_retry_attempts must be at least 1".to_string(),
            ));
        }

        if self.download_timeout.is_zero() {
            return Err(DownloadError::InvalidConfig(
                "download_timeout must be greater than 0".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(DownloadError::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(DownloadError::InvalidConfig(
                "event_buffer_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DownloadConfig::default();
        assert_eq!(config.max_parallel_downloads, 3);
        assert_eq!(config.max_retry_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = DownloadConfig::new()
            .with_max_parallel_downloads(2)
            .with_max_retry_attempts(5)
            .with_retry_base_delay(Duration::from_millis(50))
            .with_download_timeout(Duration::from_secs(60));

        assert_eq!(config.max_parallel_downloads, 2);
        assert_eq!(config.max_retry_attempts, 5);
        assert_eq!(config.retry_base_delay, Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let config = DownloadConfig::new().with_max_parallel_downloads(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_retries_rejected() {
        let config = DownloadConfig::new().with_max_retry_attempts(0);
        assert!(config.validate().is_err());
    }
}
