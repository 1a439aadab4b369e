//! # Store Module
//!
//! Shared identifier types and the native SQLite persistence adapter.
//!
//! ## Overview
//!
//! - [`TrackId`](models::TrackId) - opaque track identifier used as the
//!   primary key across every persisted and in-memory structure
//! - [`SqliteAdapter`](adapters::SqliteAdapter) - `sqlx`-backed implementation
//!   of the [`DatabaseAdapter`](bridge_traits::database::DatabaseAdapter)
//!   bridge trait (WAL mode, pooled connections)
//!
//! Repositories in the domain crates own their schema; this crate only
//! provides the connection surface they run against.

pub mod adapters;
pub mod models;

pub use adapters::SqliteAdapter;
pub use models::TrackId;
