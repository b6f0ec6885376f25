//! Tile persistence.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ColorType, ImageFormat};
use patch_common::{CaptureKind, RasterSize};

use crate::error::{Result, TilingError};
use crate::geotiff::{write_geotiff, GeoKeys};
use crate::record::TileRecord;
use crate::tiler::Tile;

/// Writes the tiles of one capture into `<output_root>/<capture>/`.
#[derive(Debug, Clone)]
pub struct TileWriter {
    dir: PathBuf,
    kind: CaptureKind,
    png_previews: bool,
    geokeys: GeoKeys,
}

impl TileWriter {
    /// Create the capture's output folder.
    pub fn create(output_root: &Path, capture: &str, kind: CaptureKind) -> Result<Self> {
        let dir = output_root.join(capture);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            kind,
            png_previews: false,
            geokeys: GeoKeys::default(),
        })
    }

    /// Also write an 8-bit PNG of every raw tile.
    pub fn with_png_previews(mut self, enabled: bool) -> Self {
        self.png_previews = enabled;
        self
    }

    /// CRS keys stamped onto every GeoTIFF tile.
    pub fn with_geokeys(mut self, geokeys: Option<GeoKeys>) -> Self {
        self.geokeys = geokeys.unwrap_or_default();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one tile image and its record.
    pub fn write(&self, tile: &Tile, record: &TileRecord) -> Result<()> {
        let id = &record.patch_id;
        let image_path = self.dir.join(format!("{id}.{}", self.kind.tile_extension()));

        if self.kind.is_geocoded() {
            write_geotiff(
                &image_path,
                RasterSize::new(tile.size, tile.size),
                &tile.pixels,
                &tile.transform,
                &self.geokeys,
            )?;
        } else {
            let bytes = tile.pixels.as_u8().ok_or_else(|| TilingError::UnsupportedLayout {
                path: image_path.clone(),
                message: format!("raw tiles must be u8, got {}", tile.pixels.sample_type()),
            })?;
            fs::write(&image_path, bytes)?;

            if self.png_previews {
                image::save_buffer_with_format(
                    self.dir.join(format!("{id}.png")),
                    bytes,
                    tile.size as u32,
                    tile.size as u32,
                    ColorType::L8,
                    ImageFormat::Png,
                )?;
            }
        }

        fs::write(self.dir.join(format!("{id}.json")), record.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::PixelBuffer;
    use crate::record::CaptureFacts;
    use image::GenericImageView;
    use patch_common::{GeoTransform, PixelOffset};

    fn raw_tile() -> Tile {
        Tile {
            index: 0,
            offset: PixelOffset::new(0, 0),
            size: 4,
            pixels: PixelBuffer::U8((0..16).collect()),
            transform: GeoTransform::identity(),
        }
    }

    #[test]
    fn test_raw_tile_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TileWriter::create(dir.path(), "ohr_001", CaptureKind::RawStrip)
            .unwrap()
            .with_png_previews(true);
        let facts = CaptureFacts::without_sidecars("ohr_001", CaptureKind::RawStrip);
        let tile = raw_tile();
        let record = TileRecord::fuse(&facts, &tile);

        writer.write(&tile, &record).unwrap();

        let base = dir.path().join("ohr_001");
        let bytes = fs::read(base.join("ohr_001_patch_0000.img")).unwrap();
        assert_eq!(bytes, (0..16).collect::<Vec<u8>>());

        let preview = image::open(base.join("ohr_001_patch_0000.png")).unwrap();
        assert_eq!((preview.width(), preview.height()), (4, 4));

        let json = fs::read_to_string(base.join("ohr_001_patch_0000.json")).unwrap();
        let parsed: TileRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_previews_off_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TileWriter::create(dir.path(), "ohr_002", CaptureKind::RawStrip).unwrap();
        let facts = CaptureFacts::without_sidecars("ohr_002", CaptureKind::RawStrip);
        let tile = raw_tile();
        writer.write(&tile, &TileRecord::fuse(&facts, &tile)).unwrap();

        assert!(!writer.dir().join("ohr_002_patch_0000.png").exists());
    }

    #[test]
    fn test_raw_tile_rejects_wide_samples() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TileWriter::create(dir.path(), "ohr_003", CaptureKind::RawStrip).unwrap();
        let mut tile = raw_tile();
        tile.pixels = PixelBuffer::U16(vec![0; 16]);
        let facts = CaptureFacts::without_sidecars("ohr_003", CaptureKind::RawStrip);

        assert!(matches!(
            writer.write(&tile, &TileRecord::fuse(&facts, &tile)),
            Err(TilingError::UnsupportedLayout { .. })
        ));
    }
}
