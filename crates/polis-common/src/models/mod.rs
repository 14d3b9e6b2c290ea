//! Core domain models shared across all Polis crates.
//!
//! These are the "truth" types — what the store persists and the engine
//! recomputes. Every row is identified by a UUID.

pub mod ballot;
pub mod community;
pub mod delegation;
pub mod reference;
pub mod request;
pub mod resource;
pub mod status;

/// Re-export all model types for convenience.
pub use ballot::*;
pub use community::*;
pub use delegation::*;
pub use reference::*;
pub use request::*;
pub use resource::*;
pub use status::*;
