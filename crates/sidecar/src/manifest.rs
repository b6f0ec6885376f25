//! Capture folder discovery.
//!
//! A folder is listed exactly once and every file is sorted into a typed
//! slot. Extractors consume the manifest and never re-scan the folder.

use std::path::{Path, PathBuf};

use patch_common::CaptureKind;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, SidecarError};

/// File naming rules for the primary image of a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRules {
    /// Primary image name for raw strips
    pub raw_image_name: String,
    /// Primary image name for GeoTIFF captures
    pub geocoded_image_name: String,
}

impl Default for ManifestRules {
    fn default() -> Self {
        Self {
            raw_image_name: "image.img".to_string(),
            geocoded_image_name: "image.tif".to_string(),
        }
    }
}

impl ManifestRules {
    fn primary_name(&self, kind: CaptureKind) -> &str {
        if kind.is_geocoded() {
            &self.geocoded_image_name
        } else {
            &self.raw_image_name
        }
    }
}

/// Sidecar roles recognised from file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SidecarRole {
    SizeDescriptor,
    SolarGeometry,
    Attitude,
    GroundControl,
}

/// Classify a file by extension (and, for XML, by name).
fn classify(file_name: &str) -> Option<SidecarRole> {
    let lower = file_name.to_lowercase();
    let ext = Path::new(&lower).extension().and_then(|e| e.to_str())?;

    match ext {
        "xml" if lower.contains("meta") => Some(SidecarRole::SizeDescriptor),
        "spm" => Some(SidecarRole::SolarGeometry),
        "oat" => Some(SidecarRole::Attitude),
        "csv" => Some(SidecarRole::GroundControl),
        _ => None,
    }
}

/// Files belonging to one capture folder, resolved once.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureManifest {
    /// Capture name (the folder name)
    pub name: String,
    /// Folder path
    pub root: PathBuf,
    /// Product type, decided by the source directory the folder lives in
    pub kind: CaptureKind,
    /// Primary image, if present
    pub primary_image: Option<PathBuf>,
    /// PDS4 label documents describing the raster
    pub size_descriptors: Vec<PathBuf>,
    /// Solar-geometry telemetry (`.spm`)
    pub solar_files: Vec<PathBuf>,
    /// Orbit/attitude telemetry (`.oat`)
    pub attitude_files: Vec<PathBuf>,
    /// Ground-control point tables (`.csv`)
    pub ground_control_files: Vec<PathBuf>,
}

impl CaptureManifest {
    /// List `root` and sort its files into manifest slots.
    ///
    /// Files are visited in name order so results are deterministic.
    /// Subdirectories are not descended into.
    pub fn discover(root: &Path, kind: CaptureKind, rules: &ManifestRules) -> Result<Self> {
        if !root.is_dir() {
            return Err(SidecarError::Discovery {
                path: root.to_path_buf(),
                message: "not a directory".to_string(),
            });
        }

        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());

        let mut manifest = Self {
            name,
            root: root.to_path_buf(),
            kind,
            primary_image: None,
            size_descriptors: Vec::new(),
            solar_files: Vec::new(),
            attitude_files: Vec::new(),
            ground_control_files: Vec::new(),
        };

        let primary_name = rules.primary_name(kind);

        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| SidecarError::Discovery {
                path: root.to_path_buf(),
                message: e.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            let path = entry.path().to_path_buf();

            if file_name == primary_name {
                manifest.primary_image = Some(path);
                continue;
            }

            match classify(&file_name) {
                Some(SidecarRole::SizeDescriptor) => manifest.size_descriptors.push(path),
                Some(SidecarRole::SolarGeometry) => manifest.solar_files.push(path),
                Some(SidecarRole::Attitude) => manifest.attitude_files.push(path),
                Some(SidecarRole::GroundControl) => manifest.ground_control_files.push(path),
                None => {}
            }
        }

        debug!(
            capture = %manifest.name,
            kind = %kind,
            primary = manifest.primary_image.is_some(),
            descriptors = manifest.size_descriptors.len(),
            solar = manifest.solar_files.len(),
            attitude = manifest.attitude_files.len(),
            ground_control = manifest.ground_control_files.len(),
            "Discovered capture files"
        );

        Ok(manifest)
    }
}
