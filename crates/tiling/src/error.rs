//! Error types for the tiling crate.

use std::path::PathBuf;

use patch_common::RasterSize;
use sidecar::SidecarError;
use thiserror::Error;

/// Errors that can occur while tiling a capture.
#[derive(Error, Debug)]
pub enum TilingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capture {capture} has no primary image")]
    MissingImage { capture: String },

    #[error("Raster size of {capture} could not be resolved")]
    SizeUnresolved { capture: String },

    #[error("Raw image {path} holds {actual} bytes, expected {expected} for {size}")]
    SizeMismatch {
        path: PathBuf,
        size: RasterSize,
        expected: usize,
        actual: usize,
    },

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Unsupported raster layout in {path}: {message}")]
    UnsupportedLayout { path: PathBuf, message: String },

    #[error("Failed to serialize tile record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to encode preview: {0}")]
    Preview(#[from] image::ImageError),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to list {path}: {message}")]
    Discovery { path: PathBuf, message: String },

    #[error(transparent)]
    Sidecar(#[from] SidecarError),
}

/// Result type for tiling operations.
pub type Result<T> = std::result::Result<T, TilingError>;
