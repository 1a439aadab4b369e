//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-streaming`, `core-download`). Host
//! applications can depend on `smc-workspace` and enable the documented
//! features without needing to wire each crate individually.
