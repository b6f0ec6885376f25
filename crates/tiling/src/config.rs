//! Configuration for capture tiling.

use std::path::{Path, PathBuf};

use patch_common::CaptureKind;
use serde::{Deserialize, Serialize};
use sidecar::ManifestRules;

use crate::error::{Result, TilingError};

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: usize = 512;

/// A source directory under the input root and the product type it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDir {
    /// Directory name relative to the input root
    pub directory: String,
    /// Product type of every capture folder inside it
    pub kind: CaptureKind,
}

impl SourceDir {
    pub fn new(directory: impl Into<String>, kind: CaptureKind) -> Self {
        Self {
            directory: directory.into(),
            kind,
        }
    }
}

/// Configuration for a tiling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilingConfig {
    /// Root holding `<source_dir>/<capture>/` folders.
    pub input_root: PathBuf,

    /// Root receiving `<capture>/` tile folders.
    pub output_root: PathBuf,

    /// Tile edge length in pixels.
    pub tile_size: usize,

    /// Source directories, processed in order.
    pub sources: Vec<SourceDir>,

    /// Primary image name in raw-strip captures.
    pub raw_image_name: String,

    /// Primary image name in geocoded captures.
    pub geocoded_image_name: String,

    /// Write an 8-bit PNG next to every raw tile.
    pub png_previews: bool,

    /// Number of captures processed concurrently.
    pub workers: usize,

    /// Write `run_summary.json` into the output root.
    pub write_summary: bool,
}

impl Default for TilingConfig {
    fn default() -> Self {
        let rules = ManifestRules::default();
        Self {
            input_root: PathBuf::from("data/extracted"),
            output_root: PathBuf::from("data/patches"),
            tile_size: DEFAULT_TILE_SIZE,
            sources: vec![
                SourceDir::new("ohrc", CaptureKind::RawStrip),
                SourceDir::new("tmc", CaptureKind::Orthoimage),
                SourceDir::new("dtm", CaptureKind::ElevationModel),
            ],
            raw_image_name: rules.raw_image_name,
            geocoded_image_name: rules.geocoded_image_name,
            png_previews: false,
            workers: 1,
            write_summary: true,
        }
    }
}

impl TilingConfig {
    /// Load configuration from a YAML file. Missing keys take their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Override values from `PATCH_*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Override values from a variable lookup. Unparseable values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("PATCH_INPUT_DIR") {
            self.input_root = PathBuf::from(val);
        }

        if let Some(val) = lookup("PATCH_OUTPUT_DIR") {
            self.output_root = PathBuf::from(val);
        }

        if let Some(val) = lookup("PATCH_TILE_SIZE") {
            if let Ok(size) = val.parse() {
                self.tile_size = size;
            }
        }

        if let Some(val) = lookup("PATCH_WORKERS") {
            if let Ok(workers) = val.parse() {
                self.workers = workers;
            }
        }

        if let Some(val) = lookup("PATCH_PNG_PREVIEWS") {
            self.png_previews = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(TilingError::InvalidConfig("tile_size must be > 0".to_string()));
        }

        if self.workers == 0 {
            return Err(TilingError::InvalidConfig("workers must be > 0".to_string()));
        }

        if self.sources.is_empty() {
            return Err(TilingError::InvalidConfig(
                "at least one source directory is required".to_string(),
            ));
        }

        if self.raw_image_name.is_empty() || self.geocoded_image_name.is_empty() {
            return Err(TilingError::InvalidConfig(
                "primary image names must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// File naming rules handed to capture discovery.
    pub fn manifest_rules(&self) -> ManifestRules {
        ManifestRules {
            raw_image_name: self.raw_image_name.clone(),
            geocoded_image_name: self.geocoded_image_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = TilingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tile_size, 512);
        assert_eq!(config.workers, 1);
        assert_eq!(config.sources[0], SourceDir::new("ohrc", CaptureKind::RawStrip));
    }

    #[test]
    fn test_zero_tile_size_rejected() {
        let config = TilingConfig {
            tile_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TilingError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_workers_and_empty_sources_rejected() {
        let no_workers = TilingConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(no_workers.validate().is_err());

        let no_sources = TilingConfig {
            sources: vec![],
            ..Default::default()
        };
        assert!(no_sources.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
input_root: /mnt/extracted
tile_size: 256
sources:
  - directory: ohrc_v2
    kind: raw-strip
  - directory: dem
    kind: elevation-model
"#;
        let config = TilingConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.input_root, PathBuf::from("/mnt/extracted"));
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[1].kind, CaptureKind::ElevationModel);
        assert_eq!(config.raw_image_name, "image.img");
        assert!(config.write_summary);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PATCH_OUTPUT_DIR", "/tmp/out"),
            ("PATCH_TILE_SIZE", "128"),
            ("PATCH_WORKERS", "not-a-number"),
            ("PATCH_PNG_PREVIEWS", "TRUE"),
        ]
        .into_iter()
        .collect();

        let mut config = TilingConfig::default();
        config.apply_env_with(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.output_root, PathBuf::from("/tmp/out"));
        assert_eq!(config.tile_size, 128);
        assert_eq!(config.workers, 1);
        assert!(config.png_previews);
    }
}
