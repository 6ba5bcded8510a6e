//! Error types shared across Gazelens crates.

use std::path::PathBuf;

/// Top-level error type for Gazelens operations.
#[derive(Debug, thiserror::Error)]
pub enum GazelensError {
    #[error("Gaze sample error: {message}")]
    Sample { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Page error: {message}")]
    Page { message: String },

    #[error("Messaging error: {message}")]
    Messaging { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using GazelensError.
pub type GazelensResult<T> = Result<T, GazelensError>;

impl GazelensError {
    pub fn sample(msg: impl Into<String>) -> Self {
        Self::Sample {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn page(msg: impl Into<String>) -> Self {
        Self::Page {
            message: msg.into(),
        }
    }

    pub fn messaging(msg: impl Into<String>) -> Self {
        Self::Messaging {
            message: msg.into(),
        }
    }
}
