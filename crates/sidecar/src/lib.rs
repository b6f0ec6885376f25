//! Sidecar metadata for capture folders.
//!
//! A capture folder holds one primary image plus optional sidecar files.
//! This crate discovers those files once ([`CaptureManifest`]) and extracts
//! folder-level facts from them:
//!
//! - raster dimensions from PDS4 label documents ([`size`])
//! - solar angles and spacecraft attitude from telemetry tables ([`sensor`])
//! - a sparse pixel → lon/lat grid from ground-control CSVs ([`coords`])
//!
//! Every extractor returns explicit `Result`/`Option` values. Deciding how a
//! missing fact affects the capture is left to the caller.

pub mod coords;
pub mod error;
pub mod manifest;
pub mod sensor;
pub mod size;

pub use coords::CoordinateGrid;
pub use error::{Result, SidecarError};
pub use manifest::{CaptureManifest, ManifestRules};
pub use sensor::{read_attitude, read_solar_angles, Attitude, SensorGeometry, SolarAngles};
pub use size::{parse_size_descriptor, resolve_size, PDS4_NAMESPACE};
