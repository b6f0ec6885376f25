//! Per-tile metadata records.
//!
//! A record always names the tile and its pixel offset. Geocoded sources add
//! the tile's affine transform; raw strips add whatever acquisition geometry
//! and geolocation could be resolved for the capture. Unresolved values are
//! left out of the JSON entirely rather than written as `null`.

use patch_common::{CaptureKind, GeoTransform};
use serde::{Deserialize, Serialize};
use sidecar::{CoordinateGrid, SensorGeometry};

use crate::tiler::Tile;

/// Identifier of the `index`-th tile of a capture.
pub fn tile_id(capture: &str, index: usize) -> String {
    format!("{capture}_patch_{index:04}")
}

/// Folder-level facts shared by every tile of a capture.
#[derive(Debug, Clone)]
pub struct CaptureFacts {
    pub name: String,
    pub kind: CaptureKind,
    pub sensor: SensorGeometry,
    pub grid: CoordinateGrid,
}

impl CaptureFacts {
    /// Facts with no sensor geometry or geolocation, as used for
    /// geocoded captures.
    pub fn without_sidecars(name: impl Into<String>, kind: CaptureKind) -> Self {
        Self {
            name: name.into(),
            kind,
            sensor: SensorGeometry::default(),
            grid: CoordinateGrid::default(),
        }
    }
}

/// Serialized metadata of one tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    pub patch_id: String,
    pub pixel_x: usize,
    pub pixel_y: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<GeoTransform>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sun_elevation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sun_azimuth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satellite_yaw: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satellite_roll: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satellite_pitch: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
}

impl TileRecord {
    /// Combine a tile with its capture's facts.
    ///
    /// Geolocation is looked up at the tile's center pixel.
    pub fn fuse(facts: &CaptureFacts, tile: &Tile) -> Self {
        let mut record = Self {
            patch_id: tile_id(&facts.name, tile.index),
            pixel_x: tile.offset.col,
            pixel_y: tile.offset.row,
            transform: None,
            sun_elevation: None,
            sun_azimuth: None,
            satellite_yaw: None,
            satellite_roll: None,
            satellite_pitch: None,
            longitude: None,
            latitude: None,
        };

        if facts.kind.is_geocoded() {
            record.transform = Some(tile.transform);
            return record;
        }

        let sensor = &facts.sensor;
        record.sun_elevation = sensor.sun_elevation;
        record.sun_azimuth = sensor.sun_azimuth;
        record.satellite_yaw = sensor.yaw;
        record.satellite_roll = sensor.roll;
        record.satellite_pitch = sensor.pitch;

        let (cx, cy) = tile.offset.center(tile.size);
        if let Some(pos) = facts.grid.lookup(cx as i64, cy as i64) {
            record.longitude = Some(pos.lon);
            record.latitude = Some(pos.lat);
        }

        record
    }

    /// Pretty-printed JSON (two-space indent).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
