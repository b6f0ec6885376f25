//! Raster geometry value types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height of a raster in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RasterSize {
    pub width: usize,
    pub height: usize,
}

impl RasterSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

impl fmt::Display for RasterSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Upper-left pixel position of a tile inside its source raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelOffset {
    pub col: usize,
    pub row: usize,
}

impl PixelOffset {
    pub fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }

    /// Pixel at the center of a square window of `size` starting here.
    pub fn center(&self, size: usize) -> (usize, usize) {
        (self.col + size / 2, self.row + size / 2)
    }
}

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Linear interpolation towards `other` by `ratio` (0 = self, 1 = other).
    ///
    /// Longitude and latitude are interpolated independently.
    pub fn lerp(&self, other: &LonLat, ratio: f64) -> LonLat {
        LonLat {
            lon: self.lon + ratio * (other.lon - self.lon),
            lat: self.lat + ratio * (other.lat - self.lat),
        }
    }
}
