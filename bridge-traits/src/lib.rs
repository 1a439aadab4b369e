//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the streaming core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that is provided differently per host (desktop player,
//! mobile shell, test harness):
//!
//! - [`HttpClient`](http::HttpClient) - transport for metadata requests and
//!   media downloads; the core never constructs its own HTTP stack
//! - [`NetworkMonitor`](network::NetworkMonitor) - connectivity and metered
//!   network detection, consumed by encoding selection
//! - [`ByteRangeCache`](cache::ByteRangeCache) - local byte-range storage for
//!   previously fetched media content (playback and download tiers)
//! - [`DatabaseAdapter`](database::DatabaseAdapter) - key/value-agnostic SQL
//!   surface for persisted metadata
//! - [`Clock`](time::Clock) - injectable time source so URL expiry can be
//!   tested deterministically
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so implementations can be
//! shared across async tasks behind `Arc`.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert their native errors into it and include
//! enough context (URL, key, SQL) to make failures actionable.

pub mod cache;
pub mod database;
pub mod error;
pub mod http;
pub mod network;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use cache::ByteRangeCache;
pub use database::{DatabaseAdapter, DatabaseConfig, QueryRow, QueryValue};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use time::{Clock, SystemClock};
