//! # polis-common
//!
//! Shared types, configuration, error handling and the store contract used
//! across all Polis crates.
//! This is the foundation layer — no consensus logic, just primitives and contracts.

pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod store;
pub mod validation;
