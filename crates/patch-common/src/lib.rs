//! Common types shared across the patch generation crates.

pub mod capture;
pub mod raster;
pub mod transform;

pub use capture::{CaptureKind, CaptureKindParseError};
pub use raster::{LonLat, PixelOffset, RasterSize};
pub use transform::GeoTransform;
