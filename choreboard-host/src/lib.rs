//! Choreboard host library.
//!
//! Exposes the host's configuration, file-backed store, and runtime wiring
//! for use in tests and embedding.

pub mod config;
pub mod runtime;
pub mod store;
