//! GeoTIFF reading and writing on top of the `tiff` crate.
//!
//! Only the georeferencing subset needed for tiling is handled:
//!
//! | Tag                     | Code  | Use                                  |
//! |-------------------------|-------|--------------------------------------|
//! | ModelPixelScaleTag      | 33550 | north-up pixel size                  |
//! | ModelTiepointTag        | 33922 | north-up origin                      |
//! | ModelTransformationTag  | 34264 | full affine (rotated rasters)        |
//! | GeoKeyDirectoryTag      | 34735 | CRS definition, carried verbatim     |
//! | GeoDoubleParamsTag      | 34736 | CRS parameters, carried verbatim     |
//! | GeoAsciiParamsTag       | 34737 | CRS citation, carried verbatim       |
//!
//! The GeoKey tags are never interpreted; tiles simply inherit the CRS of
//! their source.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::Path;

use patch_common::{GeoTransform, RasterSize};
use tiff::decoder::{Decoder, Limits};
use tiff::encoder::colortype::{
    Gray16, Gray32, Gray32Float, Gray64, Gray64Float, Gray8, GrayI16, GrayI32, GrayI64, GrayI8,
};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{Result, TilingError};
use crate::pixels::PixelBuffer;

pub const MODEL_PIXEL_SCALE: u16 = 33550;
pub const MODEL_TIEPOINT: u16 = 33922;
pub const MODEL_TRANSFORMATION: u16 = 34264;
pub const GEO_KEY_DIRECTORY: u16 = 34735;
pub const GEO_DOUBLE_PARAMS: u16 = 34736;
pub const GEO_ASCII_PARAMS: u16 = 34737;

fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// CRS-defining GeoKey tags of a source raster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoKeys {
    pub directory: Vec<u16>,
    pub double_params: Vec<f64>,
    pub ascii_params: Option<String>,
}

impl GeoKeys {
    pub fn is_empty(&self) -> bool {
        self.directory.is_empty() && self.double_params.is_empty() && self.ascii_params.is_none()
    }
}

/// Band 1 of a GeoTIFF with its georeferencing.
#[derive(Debug, Clone)]
pub struct GeoRaster {
    pub size: RasterSize,
    pub pixels: PixelBuffer,
    pub transform: GeoTransform,
    pub geokeys: GeoKeys,
}

/// Read the first band of a GeoTIFF.
///
/// Chunky multi-sample images are reduced to their first sample. The
/// transform falls back to identity when the file carries no model tags.
/// Decoding is not capped by the `tiff` crate's default buffer limits, so
/// full-size orthoimages and elevation models load in one piece.
pub fn read_geotiff(path: &Path) -> Result<GeoRaster> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let size = RasterSize::new(width as usize, height as usize);

    let transform = read_transform(&mut decoder)?;
    let geokeys = read_geokeys(&mut decoder)?;

    let pixels = PixelBuffer::from(decoder.read_image()?);
    let pixel_count = size.pixel_count();
    if pixel_count == 0 || pixels.len() % pixel_count != 0 {
        return Err(TilingError::UnsupportedLayout {
            path: path.to_path_buf(),
            message: format!(
                "{} samples do not divide into {} pixels",
                pixels.len(),
                pixel_count
            ),
        });
    }
    let samples_per_pixel = pixels.len() / pixel_count;

    debug!(
        path = %path.display(),
        %size,
        sample_type = pixels.sample_type(),
        samples_per_pixel,
        "Decoded GeoTIFF"
    );

    Ok(GeoRaster {
        size,
        pixels: pixels.first_band(samples_per_pixel),
        transform,
        geokeys,
    })
}

fn read_f64_tag<R: Read + Seek>(decoder: &mut Decoder<R>, code: u16) -> Result<Option<Vec<f64>>> {
    match decoder.find_tag(geo_tag(code))? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    if let Some(m) = read_f64_tag(decoder, MODEL_TRANSFORMATION)? {
        if m.len() >= 8 {
            return Ok(GeoTransform::new(m[0], m[1], m[3], m[4], m[5], m[7]));
        }
    }

    let scale = read_f64_tag(decoder, MODEL_PIXEL_SCALE)?;
    let tiepoint = read_f64_tag(decoder, MODEL_TIEPOINT)?;

    match (scale, tiepoint) {
        (Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
            // Tie point (i, j, k, x, y, z): raster (i, j) sits at model (x, y).
            let a = scale[0];
            let e = -scale[1];
            let c = tie[3] - tie[0] * a;
            let f = tie[4] - tie[1] * e;
            Ok(GeoTransform::new(a, 0.0, c, 0.0, e, f))
        }
        _ => Ok(GeoTransform::identity()),
    }
}

fn read_geokeys<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoKeys> {
    let directory = match decoder.find_tag(geo_tag(GEO_KEY_DIRECTORY))? {
        Some(value) => value.into_u32_vec()?.into_iter().map(|v| v as u16).collect(),
        None => Vec::new(),
    };
    let double_params = read_f64_tag(decoder, GEO_DOUBLE_PARAMS)?.unwrap_or_default();
    let ascii_params = match decoder.find_tag(geo_tag(GEO_ASCII_PARAMS))? {
        Some(value) => Some(value.into_string()?),
        None => None,
    };

    Ok(GeoKeys {
        directory,
        double_params,
        ascii_params,
    })
}

/// Write one band and its georeferencing.
///
/// North-up transforms are stored as pixel scale plus tie point; rotated
/// ones as a model transformation matrix. An identity transform writes no
/// model tags.
macro_rules! encode_band {
    ($encoder:expr, $color:ty, $size:expr, $data:expr, $transform:expr, $geokeys:expr) => {{
        let mut image = $encoder.new_image::<$color>($size.width as u32, $size.height as u32)?;
        let dir = image.encoder();

        if $transform.is_rotated() {
            let t = $transform;
            let matrix = [
                t.a, t.b, 0.0, t.c, //
                t.d, t.e, 0.0, t.f, //
                0.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ];
            dir.write_tag(geo_tag(MODEL_TRANSFORMATION), &matrix[..])?;
        } else if !$transform.is_identity() {
            let scale = [$transform.a, -$transform.e, 0.0];
            let tiepoint = [0.0, 0.0, 0.0, $transform.c, $transform.f, 0.0];
            dir.write_tag(geo_tag(MODEL_PIXEL_SCALE), &scale[..])?;
            dir.write_tag(geo_tag(MODEL_TIEPOINT), &tiepoint[..])?;
        }

        if !$geokeys.directory.is_empty() {
            dir.write_tag(geo_tag(GEO_KEY_DIRECTORY), &$geokeys.directory[..])?;
        }
        if !$geokeys.double_params.is_empty() {
            dir.write_tag(geo_tag(GEO_DOUBLE_PARAMS), &$geokeys.double_params[..])?;
        }
        if let Some(ascii) = &$geokeys.ascii_params {
            dir.write_tag(geo_tag(GEO_ASCII_PARAMS), ascii.as_str())?;
        }

        image.write_data(&$data[..])?;
    }};
}

/// Write a single-band GeoTIFF in the buffer's native sample type.
pub fn write_geotiff(
    path: &Path,
    size: RasterSize,
    pixels: &PixelBuffer,
    transform: &GeoTransform,
    geokeys: &GeoKeys,
) -> Result<()> {
    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;

    match pixels {
        PixelBuffer::U8(d) => encode_band!(encoder, Gray8, size, d, transform, geokeys),
        PixelBuffer::U16(d) => encode_band!(encoder, Gray16, size, d, transform, geokeys),
        PixelBuffer::U32(d) => encode_band!(encoder, Gray32, size, d, transform, geokeys),
        PixelBuffer::U64(d) => encode_band!(encoder, Gray64, size, d, transform, geokeys),
        PixelBuffer::I8(d) => encode_band!(encoder, GrayI8, size, d, transform, geokeys),
        PixelBuffer::I16(d) => encode_band!(encoder, GrayI16, size, d, transform, geokeys),
        PixelBuffer::I32(d) => encode_band!(encoder, GrayI32, size, d, transform, geokeys),
        PixelBuffer::I64(d) => encode_band!(encoder, GrayI64, size, d, transform, geokeys),
        PixelBuffer::F32(d) => encode_band!(encoder, Gray32Float, size, d, transform, geokeys),
        PixelBuffer::F64(d) => encode_band!(encoder, Gray64Float, size, d, transform, geokeys),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{create_elevation_grid, FixtureGeoref, InputTree};

    #[test]
    fn test_read_north_up_transform() {
        let tree = InputTree::new().unwrap();
        let capture = tree.capture("tmc", "tmc_000").unwrap();
        capture
            .geotiff_u8(
                16,
                8,
                &[3u8; 128],
                FixtureGeoref::NorthUp {
                    origin: (1000.0, 5000.0),
                    pixel_size: 5.0,
                },
            )
            .unwrap();

        let raster = read_geotiff(&capture.root().join("image.tif")).unwrap();
        assert_eq!(raster.size, RasterSize::new(16, 8));
        assert_eq!(
            raster.transform,
            GeoTransform::new(5.0, 0.0, 1000.0, 0.0, -5.0, 5000.0)
        );
        assert_eq!(raster.pixels.len(), 128);
    }

    #[test]
    fn test_read_without_georeference_is_identity() {
        let tree = InputTree::new().unwrap();
        let capture = tree.capture("tmc", "tmc_plain").unwrap();
        capture
            .geotiff_u8(4, 4, &[0u8; 16], FixtureGeoref::None)
            .unwrap();

        let raster = read_geotiff(&capture.root().join("image.tif")).unwrap();
        assert!(raster.transform.is_identity());
        assert!(raster.geokeys.is_empty());
    }

    #[test]
    fn test_read_model_transformation() {
        let tree = InputTree::new().unwrap();
        let capture = tree.capture("dtm", "dtm_rot").unwrap();
        let coeffs = [2.0, 0.5, 100.0, 0.25, -2.0, 200.0];
        capture
            .geotiff_f32(4, 4, &[1.0f32; 16], FixtureGeoref::Affine(coeffs))
            .unwrap();

        let raster = read_geotiff(&capture.root().join("image.tif")).unwrap();
        assert_eq!(raster.transform.coefficients(), coeffs);
    }

    #[test]
    fn test_write_then_read_keeps_sample_type_and_georef() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.tif");
        let size = RasterSize::new(8, 4);
        let pixels = PixelBuffer::F32(create_elevation_grid(8, 4));
        let transform = GeoTransform::north_up(-120.0, 45.0, 0.5, 0.5);
        let geokeys = GeoKeys {
            directory: vec![1, 1, 0, 1, 1024, 0, 1, 2],
            double_params: vec![],
            ascii_params: Some("Moon 2000|".to_string()),
        };

        write_geotiff(&path, size, &pixels, &transform, &geokeys).unwrap();
        let raster = read_geotiff(&path).unwrap();

        assert_eq!(raster.size, size);
        assert_eq!(raster.pixels, pixels);
        assert_eq!(raster.transform, transform);
        assert_eq!(raster.geokeys.directory, geokeys.directory);
        assert!(raster
            .geokeys
            .ascii_params
            .unwrap()
            .starts_with("Moon 2000|"));
    }

    #[test]
    fn test_write_rotated_uses_model_transformation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.tif");
        let transform = GeoTransform::new(1.0, 0.2, 10.0, -0.2, -1.0, 20.0);

        write_geotiff(
            &path,
            RasterSize::new(2, 2),
            &PixelBuffer::U16(vec![1, 2, 3, 4]),
            &transform,
            &GeoKeys::default(),
        )
        .unwrap();

        let raster = read_geotiff(&path).unwrap();
        assert_eq!(raster.transform, transform);
        assert_eq!(raster.pixels, PixelBuffer::U16(vec![1, 2, 3, 4]));
    }

    #[test]
    #[ignore = "writes and decodes a ~270 MB raster"]
    fn test_read_band_larger_than_default_decoder_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("large.tif");
        // 16400 x 16400 u8 is just over the 256 MiB default decoding buffer.
        let size = RasterSize::new(16_400, 16_400);
        let mut data = vec![7u8; size.pixel_count()];
        data[size.pixel_count() - 1] = 42;

        write_geotiff(
            &path,
            size,
            &PixelBuffer::U8(data),
            &GeoTransform::north_up(0.0, 0.0, 1.0, 1.0),
            &GeoKeys::default(),
        )
        .unwrap();

        let raster = read_geotiff(&path).unwrap();
        assert_eq!(raster.size, size);
        match raster.pixels {
            PixelBuffer::U8(values) => {
                assert_eq!(values.len(), size.pixel_count());
                assert_eq!(values[0], 7);
                assert_eq!(values[size.pixel_count() - 1], 42);
            }
            other => panic!("expected u8 band, got {}", other.sample_type()),
        }
    }
}
