//! Error types for templates.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur during template operations.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template {template} uses variable {variable} which is not provided")]
    MissingVariable { template: String, variable: String },

    #[error("Invalid template {path:?}: {message}")]
    InvalidTemplate { path: PathBuf, message: String },

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Record error: {0}")]
    Core(#[from] idcgen_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<fs_extra::error::Error> for TemplateError {
    fn from(e: fs_extra::error::Error) -> Self {
        TemplateError::CopyFailed(e.to_string())
    }
}
