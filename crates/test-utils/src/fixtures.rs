//! Synthetic capture folders and sidecar file contents.
//!
//! The builders here reproduce the on-disk layout produced by the upstream
//! extraction stage:
//!
//! ```text
//! <input_root>/<source_dir>/<capture>/image.img | image.tif
//!                                    /meta.xml
//!                                    /sun.spm
//!                                    /orbit.oat
//!                                    /coords.csv
//! ```

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tiff::encoder::colortype::{ColorType, Gray16, Gray32Float, Gray8};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

/// Namespace URI written into synthetic PDS4 labels.
pub const PDS4_NAMESPACE: &str = "http://pds.nasa.gov/pds4/pds/v1";

const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const MODEL_TRANSFORMATION_TAG: u16 = 34264;

/// A minimal PDS4 product label describing a `width` x `height` raw image.
pub fn pds4_label(width: usize, height: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Product_Observational xmlns="{PDS4_NAMESPACE}" xmlns:isda="https://isda.issdc.gov.in/pds4/isda/v1">
  <Identification_Area>
    <logical_identifier>urn:isro:isda:ch2_ohr.ncp:data_derived:synthetic</logical_identifier>
  </Identification_Area>
  <File_Area_Observational>
    <File>
      <file_name>image.img</file_name>
    </File>
    <Array_2D_Image>
      <offset unit="byte">0</offset>
      <axes>2</axes>
      <axis_index_order>Last Index Fastest</axis_index_order>
      <Element_Array>
        <data_type>UnsignedByte</data_type>
      </Element_Array>
      <Axis_Array>
        <axis_name>Line</axis_name>
        <elements>{height}</elements>
        <sequence_number>1</sequence_number>
      </Axis_Array>
      <Axis_Array>
        <axis_name>Sample</axis_name>
        <elements>{width}</elements>
        <sequence_number>2</sequence_number>
      </Axis_Array>
    </Array_2D_Image>
  </File_Area_Observational>
</Product_Observational>
"#
    )
}

/// One `.spm` data line carrying the given sun elevation and azimuth.
pub fn solar_line(elevation: f64, azimuth: f64) -> String {
    let mut tokens: Vec<String> = vec![
        "2019-09-03T08:15:32.125".to_string(),
        "1".to_string(),
    ];
    tokens.extend((2..12).map(|i| format!("{}.0", i * 10)));
    tokens.push(azimuth.to_string());
    tokens.push(elevation.to_string());
    tokens.push("0.998".to_string());
    format!("{}\n", tokens.join(" "))
}

/// One `.oat` data line carrying the given attitude angles.
pub fn attitude_line(yaw: f64, roll: f64, pitch: f64) -> String {
    let mut tokens: Vec<String> = vec!["ORBTATTD".to_string(), "2019-09-03T08:15:32".to_string()];
    tokens.extend((2..32).map(|i| format!("{:.3}", i as f64 * 1.5)));
    tokens.push(yaw.to_string());
    tokens.push(roll.to_string());
    tokens.push(pitch.to_string());
    tokens.push("1".to_string());
    format!("{}\n", tokens.join("  "))
}

/// Ground-control CSV with the historical `Lattitude` header.
///
/// Samples are `(pixel, scan, lon, lat)`.
pub fn ground_control_csv(samples: &[(i64, i64, f64, f64)]) -> String {
    let mut out = String::from("Pixel,Scan,Longitude,Lattitude\n");
    for (pixel, scan, lon, lat) in samples {
        out.push_str(&format!("{pixel},{scan},{lon},{lat}\n"));
    }
    out
}

/// Georeferencing written into synthetic GeoTIFFs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixtureGeoref {
    /// No GeoTIFF tags
    None,
    /// North-up: origin `(x, y)` and pixel size
    NorthUp { origin: (f64, f64), pixel_size: f64 },
    /// Full affine `[a, b, c, d, e, f]` via ModelTransformationTag
    Affine([f64; 6]),
}

fn to_io(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

/// Write a single-band GeoTIFF.
pub fn write_geotiff<C>(
    path: &Path,
    width: u32,
    height: u32,
    data: &[C::Inner],
    georef: FixtureGeoref,
) -> io::Result<()>
where
    C: ColorType,
    [C::Inner]: TiffValue,
{
    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file)).map_err(to_io)?;
    let mut image = encoder.new_image::<C>(width, height).map_err(to_io)?;

    match georef {
        FixtureGeoref::None => {}
        FixtureGeoref::NorthUp { origin, pixel_size } => {
            let scale = [pixel_size, pixel_size, 0.0];
            let tiepoint = [0.0, 0.0, 0.0, origin.0, origin.1, 0.0];
            image
                .encoder()
                .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE_TAG), &scale[..])
                .map_err(to_io)?;
            image
                .encoder()
                .write_tag(Tag::Unknown(MODEL_TIEPOINT_TAG), &tiepoint[..])
                .map_err(to_io)?;
        }
        FixtureGeoref::Affine([a, b, c, d, e, f]) => {
            let matrix = [
                a, b, 0.0, c, //
                d, e, 0.0, f, //
                0.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ];
            image
                .encoder()
                .write_tag(Tag::Unknown(MODEL_TRANSFORMATION_TAG), &matrix[..])
                .map_err(to_io)?;
        }
    }

    image.write_data(data).map_err(to_io)?;
    Ok(())
}

/// Temporary input root holding synthetic capture folders.
pub struct InputTree {
    dir: TempDir,
}

impl InputTree {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create `<root>/<source_dir>/<name>/` and return a builder for it.
    pub fn capture(&self, source_dir: &str, name: &str) -> io::Result<CaptureBuilder> {
        let root = self.dir.path().join(source_dir).join(name);
        fs::create_dir_all(&root)?;
        Ok(CaptureBuilder { root })
    }
}

/// Writes files into one synthetic capture folder.
#[derive(Debug, Clone)]
pub struct CaptureBuilder {
    root: PathBuf,
}

impl CaptureBuilder {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an arbitrary file.
    pub fn file(&self, name: &str, contents: impl AsRef<[u8]>) -> io::Result<&Self> {
        fs::write(self.root.join(name), contents)?;
        Ok(self)
    }

    /// Headerless 8-bit strip as `image.img`.
    pub fn raw_image(&self, data: &[u8]) -> io::Result<&Self> {
        self.file("image.img", data)
    }

    /// PDS4 label `meta.xml`.
    pub fn size_label(&self, width: usize, height: usize) -> io::Result<&Self> {
        self.file("meta.xml", pds4_label(width, height))
    }

    /// Solar telemetry `sun.spm` with a header line before the data.
    pub fn solar(&self, elevation: f64, azimuth: f64) -> io::Result<&Self> {
        let content = format!("# solar position table\n{}", solar_line(elevation, azimuth));
        self.file("sun.spm", content)
    }

    /// Attitude telemetry `orbit.oat`.
    pub fn attitude(&self, yaw: f64, roll: f64, pitch: f64) -> io::Result<&Self> {
        let content = format!("HEADER RECORD\n{}", attitude_line(yaw, roll, pitch));
        self.file("orbit.oat", content)
    }

    /// Ground-control table `coords.csv`.
    pub fn ground_control(&self, samples: &[(i64, i64, f64, f64)]) -> io::Result<&Self> {
        self.file("coords.csv", ground_control_csv(samples))
    }

    /// 8-bit GeoTIFF `image.tif`.
    pub fn geotiff_u8(&self, width: u32, height: u32, data: &[u8], georef: FixtureGeoref) -> io::Result<&Self> {
        write_geotiff::<Gray8>(&self.root.join("image.tif"), width, height, data, georef)?;
        Ok(self)
    }

    /// 16-bit GeoTIFF `image.tif`.
    pub fn geotiff_u16(&self, width: u32, height: u32, data: &[u16], georef: FixtureGeoref) -> io::Result<&Self> {
        write_geotiff::<Gray16>(&self.root.join("image.tif"), width, height, data, georef)?;
        Ok(self)
    }

    /// 32-bit float GeoTIFF `image.tif` (elevation models).
    pub fn geotiff_f32(&self, width: u32, height: u32, data: &[f32], georef: FixtureGeoref) -> io::Result<&Self> {
        write_geotiff::<Gray32Float>(&self.root.join("image.tif"), width, height, data, georef)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solar_line_token_positions() {
        let line = solar_line(12.5, 250.0);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        assert!(tokens.len() >= 14);
        assert_eq!(tokens[12], "250");
        assert_eq!(tokens[13], "12.5");
    }

    #[test]
    fn test_attitude_line_token_positions() {
        let line = attitude_line(0.1, 0.2, 0.3);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        assert!(tokens.len() >= 35);
        assert_eq!(&tokens[32..35], &["0.1", "0.2", "0.3"]);
    }

    #[test]
    fn test_capture_builder_layout() {
        let tree = InputTree::new().unwrap();
        let capture = tree.capture("ohrc", "ohr_000").unwrap();
        capture.raw_image(&[0u8; 16]).unwrap().size_label(4, 4).unwrap();

        let root = tree.path().join("ohrc").join("ohr_000");
        assert!(root.join("image.img").exists());
        assert!(root.join("meta.xml").exists());
    }

    #[test]
    fn test_geotiff_fixture_readable() {
        let tree = InputTree::new().unwrap();
        let capture = tree.capture("tmc", "tmc_000").unwrap();
        capture
            .geotiff_u8(8, 4, &[7u8; 32], FixtureGeoref::NorthUp { origin: (100.0, 200.0), pixel_size: 5.0 })
            .unwrap();

        let file = File::open(capture.root().join("image.tif")).unwrap();
        let mut decoder = tiff::decoder::Decoder::new(file).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (8, 4));
    }
}
