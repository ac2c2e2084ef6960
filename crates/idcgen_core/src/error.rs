//! Error types for the core crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid value '{value}' for setting {key} (expected {expected})")]
    InvalidSetting {
        key: String,
        value: String,
        expected: String,
    },

    #[error("Missing setting {key}: {reason}")]
    MissingSetting { key: String, reason: String },

    #[error("Cannot read settings file {path:?}: {message}")]
    SettingsFile { path: PathBuf, message: String },

    #[error("Record namespace '{namespace}' not found at {path:?}; run fetch first")]
    NamespaceMissing { namespace: String, path: PathBuf },

    #[error("Malformed record {path:?}: {message}")]
    MalformedRecord { path: PathBuf, message: String },

    #[error("Record {record} is missing required field {field}")]
    MissingField { record: String, field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CoreError {
    /// Whether this error stems from invalid or incomplete configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidSetting { .. }
                | CoreError::MissingSetting { .. }
                | CoreError::SettingsFile { .. }
        )
    }

    /// Whether this error means persisted input is absent.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, CoreError::NamespaceMissing { .. })
    }
}
