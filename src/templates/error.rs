//! Template engine error types

use thiserror::Error;

/// Template loading and rendering errors
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A template failed to parse or the inheritance chain is broken
    #[error("Template load error: {0}")]
    Load(String),

    /// Rendering failed (missing variable, unknown template, ...)
    #[error("Template error: {0}")]
    Render(String),

    /// IO error while reading the override directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
