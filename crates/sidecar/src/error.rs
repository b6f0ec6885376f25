//! Error types for sidecar extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a single sidecar file.
#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to list capture folder {path}: {message}")]
    Discovery { path: PathBuf, message: String },

    #[error("Malformed XML in {path}: {message}")]
    Xml { path: PathBuf, message: String },

    #[error("Size descriptor {path} is missing axis '{axis}'")]
    MissingAxis { path: PathBuf, axis: &'static str },

    #[error("Invalid axis length '{value}' in {path}")]
    InvalidAxis { path: PathBuf, value: String },

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Ground-control file {path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: &'static str },
}

/// Result type for sidecar operations.
pub type Result<T> = std::result::Result<T, SidecarError>;
