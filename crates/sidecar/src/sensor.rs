//! Acquisition geometry from line-oriented telemetry files.
//!
//! Two formats are supported, both whitespace-separated tables:
//!
//! | File   | Min tokens | Fields used                              |
//! |--------|-----------:|------------------------------------------|
//! | `.spm` | 14         | `[12]` sun azimuth, `[13]` sun elevation |
//! | `.oat` | 35         | `[32]` yaw, `[33]` roll, `[34]` pitch    |
//!
//! The first line with enough tokens whose target fields all parse as
//! floats is used. Header and comment lines simply fail that test.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

const SOLAR_MIN_TOKENS: usize = 14;
const SOLAR_AZIMUTH_FIELD: usize = 12;
const SOLAR_ELEVATION_FIELD: usize = 13;

const ATTITUDE_MIN_TOKENS: usize = 35;
const ATTITUDE_YAW_FIELD: usize = 32;
const ATTITUDE_ROLL_FIELD: usize = 33;
const ATTITUDE_PITCH_FIELD: usize = 34;

/// Sun position at acquisition time, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarAngles {
    pub elevation: f64,
    pub azimuth: f64,
}

/// Spacecraft attitude at acquisition time, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    pub yaw: f64,
    pub roll: f64,
    pub pitch: f64,
}

/// Folder-level acquisition geometry.
///
/// Each field is resolved independently; a value for one never implies a
/// value for another.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorGeometry {
    pub sun_elevation: Option<f64>,
    pub sun_azimuth: Option<f64>,
    pub yaw: Option<f64>,
    pub roll: Option<f64>,
    pub pitch: Option<f64>,
}

impl SensorGeometry {
    pub fn from_parts(solar: Option<SolarAngles>, attitude: Option<Attitude>) -> Self {
        Self {
            sun_elevation: solar.map(|s| s.elevation),
            sun_azimuth: solar.map(|s| s.azimuth),
            yaw: attitude.map(|a| a.yaw),
            roll: attitude.map(|a| a.roll),
            pitch: attitude.map(|a| a.pitch),
        }
    }

    /// Read both telemetry kinds from the given files.
    ///
    /// Files of each kind are tried in order until one yields a value.
    /// Unreadable files are logged and skipped.
    pub fn gather(capture: &str, solar_files: &[PathBuf], attitude_files: &[PathBuf]) -> Self {
        let solar = first_resolved(capture, solar_files, read_solar_angles);
        let attitude = first_resolved(capture, attitude_files, read_attitude);
        Self::from_parts(solar, attitude)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn first_resolved<T>(
    capture: &str,
    files: &[PathBuf],
    read: fn(&Path) -> Result<Option<T>>,
) -> Option<T> {
    for path in files {
        match read(path) {
            Ok(Some(value)) => return Some(value),
            Ok(None) => {
                debug!(capture = %capture, path = %path.display(), "No qualifying telemetry line");
            }
            Err(e) => {
                warn!(capture = %capture, path = %path.display(), error = %e, "Failed to read telemetry file");
            }
        }
    }
    None
}

/// Scan `content` for the first line with at least `min_tokens` tokens whose
/// `fields` all parse as `f64`.
fn scan_fields<const N: usize>(content: &str, min_tokens: usize, fields: [usize; N]) -> Option<[f64; N]> {
    content.lines().find_map(|line| {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < min_tokens {
            return None;
        }

        let mut values = [0.0; N];
        for (slot, &index) in values.iter_mut().zip(fields.iter()) {
            *slot = tokens[index].parse::<f64>().ok()?;
        }
        Some(values)
    })
}

/// Read a file as text, replacing invalid UTF-8 sequences.
fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse solar angles from a `.spm` file.
///
/// Returns `Ok(None)` when no line qualifies.
pub fn read_solar_angles(path: &Path) -> Result<Option<SolarAngles>> {
    let content = read_lossy(path)?;
    Ok(parse_solar_angles(&content))
}

fn parse_solar_angles(content: &str) -> Option<SolarAngles> {
    scan_fields(
        content,
        SOLAR_MIN_TOKENS,
        [SOLAR_ELEVATION_FIELD, SOLAR_AZIMUTH_FIELD],
    )
    .map(|[elevation, azimuth]| SolarAngles { elevation, azimuth })
}

/// Parse yaw/roll/pitch from a `.oat` file.
///
/// Returns `Ok(None)` when no line qualifies.
pub fn read_attitude(path: &Path) -> Result<Option<Attitude>> {
    let content = read_lossy(path)?;
    Ok(parse_attitude(&content))
}

fn parse_attitude(content: &str) -> Option<Attitude> {
    scan_fields(
        content,
        ATTITUDE_MIN_TOKENS,
        [ATTITUDE_YAW_FIELD, ATTITUDE_ROLL_FIELD, ATTITUDE_PITCH_FIELD],
    )
    .map(|[yaw, roll, pitch]| Attitude { yaw, roll, pitch })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{attitude_line, solar_line};

    #[test]
    fn test_solar_field_order() {
        let content = solar_line(41.5, 123.25);
        let angles = parse_solar_angles(&content).unwrap();
        assert_eq!(angles.elevation, 41.5);
        assert_eq!(angles.azimuth, 123.25);
    }

    #[test]
    fn test_solar_skips_short_and_non_numeric_lines() {
        let mut tokens: Vec<String> = (0..14).map(|i| format!("h{i}")).collect();
        let header = tokens.join(" ");
        tokens.truncate(5);
        let short = tokens.join(" ");
        let content = format!("{header}\n{short}\n{}\n", solar_line(10.0, 20.0));

        let angles = parse_solar_angles(&content).unwrap();
        assert_eq!((angles.elevation, angles.azimuth), (10.0, 20.0));
    }

    #[test]
    fn test_solar_all_lines_short() {
        let content = "1 2 3 4 5 6 7 8 9 10 11 12 13\n\n1 2 3\n";
        assert_eq!(parse_solar_angles(content), None);
    }

    #[test]
    fn test_attitude_fields() {
        let content = attitude_line(0.5, -1.25, 2.0);
        let attitude = parse_attitude(&content).unwrap();
        assert_eq!(attitude, Attitude { yaw: 0.5, roll: -1.25, pitch: 2.0 });
    }

    #[test]
    fn test_attitude_requires_35_tokens() {
        let line: Vec<String> = (0..34).map(|i| i.to_string()).collect();
        assert_eq!(parse_attitude(&line.join(" ")), None);
    }

    #[test]
    fn test_gather_is_independent_per_kind() {
        let dir = tempfile::tempdir().unwrap();
        let solar = dir.path().join("sun.spm");
        let attitude = dir.path().join("orbit.oat");
        fs::write(&solar, solar_line(5.0, 6.0)).unwrap();
        fs::write(&attitude, "too short\n").unwrap();

        let geometry = SensorGeometry::gather("ohr_000", &[solar], &[attitude]);
        assert_eq!(geometry.sun_elevation, Some(5.0));
        assert_eq!(geometry.sun_azimuth, Some(6.0));
        assert_eq!(geometry.yaw, None);
        assert_eq!(geometry.roll, None);
        assert_eq!(geometry.pitch, None);
    }

    #[test]
    fn test_gather_skips_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.oat");
        let good = dir.path().join("orbit.oat");
        fs::write(&good, attitude_line(1.0, 2.0, 3.0)).unwrap();

        let geometry = SensorGeometry::gather("ohr_000", &[], &[missing, good]);
        assert_eq!(geometry.yaw, Some(1.0));
        assert_eq!(geometry.sun_elevation, None);
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sun.spm");
        let mut bytes = vec![0xff, 0xfe, b'\n'];
        bytes.extend_from_slice(solar_line(7.0, 8.0).as_bytes());
        fs::write(&path, bytes).unwrap();

        let angles = read_solar_angles(&path).unwrap().unwrap();
        assert_eq!(angles.elevation, 7.0);
    }

    #[test]
    fn test_empty_geometry() {
        assert!(SensorGeometry::gather("ohr_000", &[], &[]).is_empty());
    }
}
