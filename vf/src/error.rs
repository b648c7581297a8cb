//! View error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while locating, compiling or rendering a view
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("View [{name}] not found")]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("No hint path defined for [{namespace}]")]
    NoHintPath { namespace: String },

    #[error("View [{name}] has an invalid name")]
    InvalidName { name: String },

    #[error("Unrecognized extension in file: {path}")]
    NoEngine { path: PathBuf },

    #[error("Engine [{name}] not found")]
    UnknownEngine { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template compile error: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("Template render error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ViewError {
    /// Check if this error means the view simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ViewError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, ViewError>;
