//! Fixed-size tile extraction.
//!
//! Tiles are taken on a regular grid stepping by the tile size from the
//! upper-left corner. Windows that would run past the right or bottom edge
//! are dropped rather than padded, so every emitted tile is exactly
//! `size` x `size`. Tiles are numbered densely in row-major order.

use patch_common::{GeoTransform, PixelOffset, RasterSize};

use crate::error::{Result, TilingError};
use crate::pixels::PixelBuffer;
use crate::source::ImageSource;

/// One extracted tile.
#[derive(Debug, Clone)]
pub struct Tile {
    /// Zero-based position in emission order
    pub index: usize,
    pub offset: PixelOffset,
    pub size: usize,
    pub pixels: PixelBuffer,
    /// Source transform moved to this tile's upper-left pixel
    pub transform: GeoTransform,
}

/// Splits image sources into square tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilingEngine {
    tile_size: usize,
}

impl TilingEngine {
    /// Create an engine for `tile_size` x `tile_size` tiles.
    pub fn new(tile_size: usize) -> Result<Self> {
        if tile_size == 0 {
            return Err(TilingError::InvalidConfig("tile_size must be > 0".to_string()));
        }
        Ok(Self { tile_size })
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Number of complete tiles that fit in a raster.
    pub fn tile_count(&self, size: RasterSize) -> usize {
        (size.width / self.tile_size) * (size.height / self.tile_size)
    }

    /// Upper-left offsets of every complete tile, in emission order.
    pub fn offsets(&self, size: RasterSize) -> impl Iterator<Item = PixelOffset> {
        let step = self.tile_size;
        let cols = size.width / step;
        let rows = size.height / step;
        (0..rows).flat_map(move |r| (0..cols).map(move |c| PixelOffset::new(c * step, r * step)))
    }

    /// Lazily extract the tiles of `source`.
    ///
    /// Each tile's pixels are copied only when the iterator reaches it.
    pub fn tiles<'a>(&self, source: &'a ImageSource) -> Tiles<'a> {
        let size = self.tile_size;
        Tiles {
            source,
            size,
            offsets: Box::new(self.offsets(source.size)),
            next_index: 0,
        }
    }
}

/// Iterator over the tiles of one image source.
pub struct Tiles<'a> {
    source: &'a ImageSource,
    size: usize,
    offsets: Box<dyn Iterator<Item = PixelOffset> + 'a>,
    next_index: usize,
}

impl Iterator for Tiles<'_> {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        let offset = self.offsets.next()?;
        let index = self.next_index;
        self.next_index += 1;

        Some(Tile {
            index,
            offset,
            size: self.size,
            pixels: self
                .source
                .pixels
                .window(self.source.size.width, offset.col, offset.row, self.size),
            transform: self.source.transform.translated(offset.col, offset.row),
        })
    }
}
