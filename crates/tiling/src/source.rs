//! Uniform access to a capture's pixels regardless of on-disk encoding.

use std::fs;
use std::path::Path;

use patch_common::{CaptureKind, GeoTransform, RasterSize};
use sidecar::{resolve_size, CaptureManifest};
use tracing::debug;

use crate::error::{Result, TilingError};
use crate::geotiff::{read_geotiff, GeoKeys};
use crate::pixels::PixelBuffer;

/// Decoded primary image of a capture.
///
/// Loaded once per capture and read-only afterwards.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub kind: CaptureKind,
    pub size: RasterSize,
    pub pixels: PixelBuffer,
    /// Identity for raw strips and for GeoTIFFs without model tags
    pub transform: GeoTransform,
    /// CRS keys of GeoTIFF sources, copied onto every tile
    pub geokeys: Option<GeoKeys>,
}

impl ImageSource {
    /// Load the primary image named by the manifest.
    ///
    /// Raw strips take their dimensions from the manifest's size
    /// descriptors; GeoTIFFs from their own header.
    pub fn load(manifest: &CaptureManifest) -> Result<Self> {
        let path = manifest
            .primary_image
            .as_deref()
            .ok_or_else(|| TilingError::MissingImage {
                capture: manifest.name.clone(),
            })?;

        match manifest.kind {
            CaptureKind::RawStrip => {
                let size = resolve_size(manifest).ok_or_else(|| TilingError::SizeUnresolved {
                    capture: manifest.name.clone(),
                })?;
                Self::from_raw(path, size)
            }
            kind => Self::from_geotiff(path, kind),
        }
    }

    /// Decode a headerless 8-bit strip of the given size.
    ///
    /// The file must hold exactly `width * height` bytes.
    pub fn from_raw(path: &Path, size: RasterSize) -> Result<Self> {
        let bytes = fs::read(path)?;
        let expected = size.pixel_count();
        if bytes.len() != expected {
            return Err(TilingError::SizeMismatch {
                path: path.to_path_buf(),
                size,
                expected,
                actual: bytes.len(),
            });
        }

        debug!(path = %path.display(), %size, "Decoded raw strip");

        Ok(Self {
            kind: CaptureKind::RawStrip,
            size,
            pixels: PixelBuffer::U8(bytes),
            transform: GeoTransform::identity(),
            geokeys: None,
        })
    }

    /// Decode band 1 of a GeoTIFF.
    pub fn from_geotiff(path: &Path, kind: CaptureKind) -> Result<Self> {
        let raster = read_geotiff(path)?;
        let geokeys = (!raster.geokeys.is_empty()).then_some(raster.geokeys);

        Ok(Self {
            kind,
            size: raster.size,
            pixels: raster.pixels,
            transform: raster.transform,
            geokeys,
        })
    }

    pub fn width(&self) -> usize {
        self.size.width
    }

    pub fn height(&self) -> usize {
        self.size.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidecar::ManifestRules;
    use test_utils::{create_test_strip, FixtureGeoref, InputTree};

    #[test]
    fn test_raw_strip_uses_descriptor_size() {
        let tree = InputTree::new().unwrap();
        let capture = tree.capture("ohrc", "ohr_a").unwrap();
        capture
            .raw_image(&create_test_strip(6, 4))
            .unwrap()
            .size_label(6, 4)
            .unwrap();

        let manifest =
            CaptureManifest::discover(capture.root(), CaptureKind::RawStrip, &ManifestRules::default())
                .unwrap();
        let source = ImageSource::load(&manifest).unwrap();

        assert_eq!(source.size, RasterSize::new(6, 4));
        assert!(source.transform.is_identity());
        assert_eq!(source.pixels.as_u8().unwrap().len(), 24);
    }

    #[test]
    fn test_raw_strip_byte_count_must_match() {
        let tree = InputTree::new().unwrap();
        let capture = tree.capture("ohrc", "ohr_b").unwrap();
        capture.raw_image(&[0u8; 25]).unwrap().size_label(6, 4).unwrap();

        let manifest =
            CaptureManifest::discover(capture.root(), CaptureKind::RawStrip, &ManifestRules::default())
                .unwrap();

        assert!(matches!(
            ImageSource::load(&manifest),
            Err(TilingError::SizeMismatch {
                expected: 24,
                actual: 25,
                ..
            })
        ));
    }

    #[test]
    fn test_raw_strip_without_descriptor() {
        let tree = InputTree::new().unwrap();
        let capture = tree.capture("ohrc", "ohr_c").unwrap();
        capture.raw_image(&[0u8; 16]).unwrap();

        let manifest =
            CaptureManifest::discover(capture.root(), CaptureKind::RawStrip, &ManifestRules::default())
                .unwrap();

        assert!(matches!(
            ImageSource::load(&manifest),
            Err(TilingError::SizeUnresolved { .. })
        ));
    }

    #[test]
    fn test_missing_geotiff() {
        let tree = InputTree::new().unwrap();
        let capture = tree.capture("tmc", "tmc_empty").unwrap();
        capture.file("notes.txt", "no image here").unwrap();

        let manifest = CaptureManifest::discover(
            capture.root(),
            CaptureKind::Orthoimage,
            &ManifestRules::default(),
        )
        .unwrap();

        assert!(matches!(
            ImageSource::load(&manifest),
            Err(TilingError::MissingImage { .. })
        ));
    }

    #[test]
    fn test_geotiff_source() {
        let tree = InputTree::new().unwrap();
        let capture = tree.capture("tmc", "tmc_a").unwrap();
        capture
            .geotiff_u16(
                10,
                5,
                &vec![42u16; 50],
                FixtureGeoref::NorthUp {
                    origin: (0.0, 100.0),
                    pixel_size: 10.0,
                },
            )
            .unwrap();

        let manifest = CaptureManifest::discover(
            capture.root(),
            CaptureKind::Orthoimage,
            &ManifestRules::default(),
        )
        .unwrap();
        let source = ImageSource::load(&manifest).unwrap();

        assert_eq!(source.kind, CaptureKind::Orthoimage);
        assert_eq!((source.width(), source.height()), (10, 5));
        assert_eq!(source.pixels.sample_type(), "u16");
        assert_eq!(source.transform.c, 0.0);
        assert_eq!(source.transform.f, 100.0);
        assert!(source.geokeys.is_none());
    }
}
