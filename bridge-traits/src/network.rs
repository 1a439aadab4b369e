//! Network Monitoring Abstraction
//!
//! Connectivity and metering information consumed by encoding selection: on a
//! metered connection the selector deliberately biases toward lower bitrates.

use async_trait::async_trait;

use crate::error::Result;

/// Network connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    /// Cellular/mobile data connection
    Cellular,
    /// WiFi connection
    WiFi,
    /// Ethernet connection
    Ethernet,
    /// Other or unknown connection type
    Other,
}

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// Connected to network
    Connected,
    /// Not connected to any network
    Disconnected,
    /// Connection status unknown or indeterminate
    Indeterminate,
}

/// Network information
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
    pub network_type: Option<NetworkType>,
    /// Whether the connection is metered (has data limits/costs)
    pub is_metered: bool,
}

/// Network monitor trait
///
/// # Platform Support
///
/// - **Desktop**: system network APIs (NetworkManager, SystemConfiguration)
/// - **Android**: ConnectivityManager
/// - **iOS**: Network framework
#[async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Get current network information
    async fn network_info(&self) -> Result<NetworkInfo>;

    /// Check if currently connected to any network
    async fn is_connected(&self) -> bool {
        matches!(
            self.network_info().await,
            Ok(NetworkInfo {
                status: NetworkStatus::Connected,
                ..
            })
        )
    }

    /// Check if the active connection is metered.
    ///
    /// An indeterminate or failed probe is treated as unmetered.
    async fn is_metered(&self) -> bool {
        matches!(
            self.network_info().await,
            Ok(NetworkInfo {
                is_metered: true,
                ..
            })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedMonitor(NetworkInfo);

    #[async_trait]
    impl NetworkMonitor for FixedMonitor {
        async fn network_info(&self) -> Result<NetworkInfo> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_metered_detection() {
        let monitor = FixedMonitor(NetworkInfo {
            status: NetworkStatus::Connected,
            network_type: Some(NetworkType::Cellular),
            is_metered: true,
        });

        assert!(monitor.is_connected().await);
        assert!(monitor.is_metered().await);
    }

    #[tokio::test]
    async fn test_unmetered_wifi() {
        let monitor = FixedMonitor(NetworkInfo {
            status: NetworkStatus::Connected,
            network_type: Some(NetworkType::WiFi),
            is_metered: false,
        });

        assert!(!monitor.is_metered().await);
    }
}
