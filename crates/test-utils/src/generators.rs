//! Pixel pattern generators.
//!
//! These generators create predictable, verifiable pixel patterns so tests
//! can check that a tile holds exactly the window it claims to.

/// Creates an 8-bit raster where each pixel encodes its position.
///
/// Value is `(col + 3 * row) % 251`. The prime modulus keeps neighbouring
/// tiles from repeating each other at common tile sizes.
///
/// # Example
///
/// ```
/// use test_utils::create_test_strip;
///
/// let strip = create_test_strip(4, 2);
/// assert_eq!(strip.len(), 8);
/// assert_eq!(strip[1], 1);   // col=1, row=0
/// assert_eq!(strip[4], 3);   // col=0, row=1
/// ```
pub fn create_test_strip(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(strip_value(col, row));
        }
    }
    data
}

/// Expected value of [`create_test_strip`] at `(col, row)`.
pub fn strip_value(col: usize, row: usize) -> u8 {
    ((col + 3 * row) % 251) as u8
}

/// Creates an elevation-like grid in meters, sloping from west to east.
pub fn create_elevation_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(-2500.0 + col as f32 * 2.0 - row as f32 * 0.5);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_matches_value_fn() {
        let strip = create_test_strip(300, 7);
        assert_eq!(strip[6 * 300 + 299], strip_value(299, 6));
    }

    #[test]
    fn test_elevation_grid_size() {
        assert_eq!(create_elevation_grid(16, 8).len(), 128);
    }
}
