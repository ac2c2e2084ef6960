//! Error types for fetching.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while reading the directory.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("No SSO instances found")]
    NoInstance,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Directory call {operation} failed: {message}")]
    Source { operation: String, message: String },

    #[error("Invalid snapshot {path:?}: {message}")]
    Snapshot { path: PathBuf, message: String },

    #[error("Core error: {0}")]
    Core(#[from] idcgen_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    pub fn source_call(operation: &str, message: impl Into<String>) -> Self {
        FetchError::Source {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }

    /// Whether the run cannot proceed because input is absent.
    pub fn is_source_unavailable(&self) -> bool {
        match self {
            FetchError::NoInstance | FetchError::Snapshot { .. } => true,
            FetchError::Core(e) => e.is_source_unavailable(),
            _ => false,
        }
    }
}
