//! # Streaming Resolution Module
//!
//! On-demand resolution of track identifiers into fetchable byte-range
//! requests, sitting on the playback hot path.
//!
//! ## Overview
//!
//! Given an opaque track id and a byte range, [`StreamDataSource`] decides —
//! in order of cost — how the bytes will be obtained:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              StreamDataSource                 │
//! │                                               │
//! │  1. Download cache hit?   → serve locally     │
//! │  2. Playback cache hit?   → serve locally     │
//! │  3. Resolved URL cached?  → rewrite request   │
//! │  4. Full resolution:                          │
//! │     FormatStore → FormatCatalog →             │
//! │     FormatSelector → UrlResolver → cache      │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Components
//!
//! - **Format Catalog** (`catalog`): queries the remote metadata service for
//!   available encodings and playability
//! - **Format Selector** (`selector`): deterministic quality/codec decision
//! - **Format Store** (`format_store`): persists the chosen encoding so cached
//!   bytes are never mixed across encodings
//! - **URL Resolver** (`resolver`): turns an encoding into a time-limited
//!   direct URL via the external cipher collaborator
//! - **Resolved URL Cache** (`url_cache`): in-memory URL/expiry map consulted
//!   before any network work

pub mod catalog;
pub mod config;
pub mod data_source;
pub mod encoding;
pub mod error;
pub mod format_store;
pub mod resolver;
pub mod selector;
pub mod url_cache;

pub use catalog::{FormatCatalog, TrackManifest};
pub use config::StreamingConfig;
pub use data_source::{StreamDataSource, StreamRequest};
pub use encoding::EncodingDescriptor;
pub use error::{Result, StreamingError};
pub use format_store::{FormatStore, MemoryFormatStore, SqliteFormatStore};
pub use resolver::{CipherError, CipherResolver, ResolvedTarget, UrlResolver};
pub use selector::{select_encoding, StreamQuality};
pub use url_cache::{ResolvedUrlCache, ResolvedUrlEntry};
