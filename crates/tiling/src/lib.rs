//! Capture tiling library.
//!
//! Turns capture folders (raw high-resolution strips, orthoimages and
//! elevation models) into fixed-size tiles, each with a JSON metadata record.
//!
//! # Architecture
//!
//! - [`source`]: decodes the primary image of a capture (headerless raw
//!   strip or GeoTIFF) into a [`PixelBuffer`] with its transform
//! - [`tiler`]: walks the raster in fixed steps and yields complete tiles
//!   with translated transforms
//! - [`record`]: fuses each tile with the capture's sensor geometry and
//!   geolocation
//! - [`writer`]: persists tile images and records
//! - [`pipeline`]: per-capture isolation and the batch runner
//!
//! Sidecar parsing lives in the `sidecar` crate.

pub mod config;
pub mod error;
pub mod geotiff;
pub mod pipeline;
pub mod pixels;
pub mod record;
pub mod source;
pub mod tiler;
pub mod writer;

// Re-exports
pub use config::{SourceDir, TilingConfig, DEFAULT_TILE_SIZE};
pub use error::{Result, TilingError};
pub use geotiff::{read_geotiff, write_geotiff, GeoKeys, GeoRaster};
pub use pipeline::{
    discover_captures, gather_facts, process_capture, run_batch, BatchReport, CaptureOptions,
    CaptureOutcome, CaptureStatus, CaptureTask, RUN_SUMMARY_FILE,
};
pub use pixels::PixelBuffer;
pub use record::{tile_id, CaptureFacts, TileRecord};
pub use source::ImageSource;
pub use tiler::{Tile, TilingEngine, Tiles};
pub use writer::TileWriter;
