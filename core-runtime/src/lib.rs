//! # Runtime Module
//!
//! Process-level plumbing shared by the streaming core crates.
//!
//! ## Overview
//!
//! This crate owns concerns that belong to the hosting process rather than to
//! any single domain crate:
//! - Structured logging initialization (`tracing` + `tracing-subscriber`)
//! - Runtime-level error type

pub mod error;
pub mod logging;

pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
