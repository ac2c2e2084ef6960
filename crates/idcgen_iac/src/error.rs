//! Error types for the generation pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for generation operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur while generating Terraform.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("No SSO instance record in {0:?}; run fetch first")]
    InstanceMissing(PathBuf),

    #[error("Registry lookup for provider {provider} failed: {message}")]
    Registry { provider: String, message: String },

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Record error: {0}")]
    Core(#[from] idcgen_core::CoreError),

    #[error("Template error: {0}")]
    Template(#[from] idcgen_templates::TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IacError {
    pub fn is_configuration(&self) -> bool {
        match self {
            IacError::Core(e) => e.is_configuration(),
            IacError::Template(idcgen_templates::TemplateError::Core(e)) => e.is_configuration(),
            _ => false,
        }
    }

    /// Whether generation stopped because fetched records are absent.
    pub fn is_source_unavailable(&self) -> bool {
        match self {
            IacError::InstanceMissing(_) => true,
            IacError::Core(e) => e.is_source_unavailable(),
            IacError::Template(idcgen_templates::TemplateError::Core(e)) => {
                e.is_source_unavailable()
            }
            _ => false,
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(
            self,
            IacError::Template(
                idcgen_templates::TemplateError::NotFound(_)
                    | idcgen_templates::TemplateError::MissingVariable { .. }
                    | idcgen_templates::TemplateError::InvalidTemplate { .. }
            )
        )
    }
}
