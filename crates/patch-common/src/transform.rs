//! Affine pixel-to-coordinate transforms.

use serde::{Deserialize, Serialize};

/// Six-coefficient affine transform from pixel space to map space.
///
/// A pixel at `(col, row)` maps to:
///
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
///
/// Coefficients follow the `(a, b, c, d, e, f)` ordering used by GDAL-style
/// tooling. The identity transform is the explicit "not georeferenced" value;
/// raw strips carry it instead of an absent transform.
///
/// Serializes as a flat `[a, b, c, d, e, f]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct GeoTransform {
    /// Pixel width (x change per column)
    pub a: f64,
    /// Row rotation (x change per row)
    pub b: f64,
    /// X of the upper-left corner of the upper-left pixel
    pub c: f64,
    /// Column rotation (y change per column)
    pub d: f64,
    /// Pixel height (y change per row, negative for north-up)
    pub e: f64,
    /// Y of the upper-left corner of the upper-left pixel
    pub f: f64,
}

impl GeoTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// The identity mapping (pixel coordinates pass through unchanged).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    /// Build a north-up transform from an origin and pixel size.
    ///
    /// `pixel_height` is the positive ground size of a row; it is stored
    /// negated so rows increase southward.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self::new(pixel_width, 0.0, origin_x, 0.0, -pixel_height, origin_y)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// True when the transform has rotation or shear terms.
    pub fn is_rotated(&self) -> bool {
        self.b != 0.0 || self.d != 0.0
    }

    /// Map a pixel position to map coordinates.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Transform of a sub-window whose upper-left pixel sits at
    /// `(col, row)` in this transform's pixel grid.
    ///
    /// Only the origin moves; scale and rotation terms are kept as-is.
    pub fn translated(&self, col: usize, row: usize) -> Self {
        let (c, f) = self.apply(col as f64, row as f64);
        Self { c, f, ..*self }
    }

    /// Coefficients as `[a, b, c, d, e, f]`.
    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<[f64; 6]> for GeoTransform {
    fn from(c: [f64; 6]) -> Self {
        Self::new(c[0], c[1], c[2], c[3], c[4], c[5])
    }
}

impl From<GeoTransform> for [f64; 6] {
    fn from(t: GeoTransform) -> Self {
        t.coefficients()
    }
}
