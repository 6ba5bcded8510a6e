//! Gazelens Common Utilities
//!
//! Shared infrastructure for all Gazelens crates:
//! - Error types and result aliases
//! - Session clock for millisecond gaze timestamps
//! - Tracing/logging initialization
//! - Configuration loading (engine tuning + logging)

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
