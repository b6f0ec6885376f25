//! Capture (acquisition folder) classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physical product type of a capture folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureKind {
    /// Headerless 8-bit strip; dimensions come from a sidecar descriptor
    RawStrip,
    /// Georeferenced orthoimage (GeoTIFF)
    Orthoimage,
    /// Georeferenced elevation model (GeoTIFF)
    ElevationModel,
}

impl CaptureKind {
    /// Whether pixels come with an embedded geospatial header.
    pub fn is_geocoded(&self) -> bool {
        !matches!(self, CaptureKind::RawStrip)
    }

    /// File extension used for persisted tiles of this kind.
    pub fn tile_extension(&self) -> &'static str {
        match self {
            CaptureKind::RawStrip => "img",
            CaptureKind::Orthoimage | CaptureKind::ElevationModel => "tif",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureKind::RawStrip => "raw-strip",
            CaptureKind::Orthoimage => "orthoimage",
            CaptureKind::ElevationModel => "elevation-model",
        }
    }
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureKind {
    type Err = CaptureKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw-strip" | "raw" | "ohrc" => Ok(CaptureKind::RawStrip),
            "orthoimage" | "ortho" | "tmc" => Ok(CaptureKind::Orthoimage),
            "elevation-model" | "dtm" | "dem" => Ok(CaptureKind::ElevationModel),
            _ => Err(CaptureKindParseError(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown capture kind: {0}")]
pub struct CaptureKindParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("OHRC".parse::<CaptureKind>().unwrap(), CaptureKind::RawStrip);
        assert_eq!("tmc".parse::<CaptureKind>().unwrap(), CaptureKind::Orthoimage);
        assert_eq!(
            "elevation-model".parse::<CaptureKind>().unwrap(),
            CaptureKind::ElevationModel
        );
        assert!("lidar".parse::<CaptureKind>().is_err());
    }

    #[test]
    fn test_tile_extension() {
        assert_eq!(CaptureKind::RawStrip.tile_extension(), "img");
        assert_eq!(CaptureKind::ElevationModel.tile_extension(), "tif");
        assert!(!CaptureKind::RawStrip.is_geocoded());
    }
}
