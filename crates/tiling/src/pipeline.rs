//! Per-capture processing and the batch runner.
//!
//! Each capture is processed in isolation: discover its files, gather
//! folder-level facts, decode the primary image once, then stream tiles to
//! disk. A capture that fails is reported as skipped and the batch moves on.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use patch_common::CaptureKind;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sidecar::{CaptureManifest, CoordinateGrid, ManifestRules, SensorGeometry};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::TilingConfig;
use crate::error::{Result, TilingError};
use crate::record::{CaptureFacts, TileRecord};
use crate::source::ImageSource;
use crate::tiler::TilingEngine;
use crate::writer::TileWriter;

/// File name of the run summary written into the output root.
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

/// A capture folder found under the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTask {
    pub name: String,
    pub root: PathBuf,
    pub kind: CaptureKind,
}

/// Options that apply to every capture of a run.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub output_root: PathBuf,
    pub rules: ManifestRules,
    pub png_previews: bool,
}

impl CaptureOptions {
    pub fn from_config(config: &TilingConfig) -> Self {
        Self {
            output_root: config.output_root.clone(),
            rules: config.manifest_rules(),
            png_previews: config.png_previews,
        }
    }
}

/// Whether a capture produced tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    Tiled,
    Skipped,
}

/// Result of processing one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureOutcome {
    pub name: String,
    pub kind: CaptureKind,
    pub status: CaptureStatus,
    pub tiles: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tile_size: usize,
    pub captures: Vec<CaptureOutcome>,
}

impl BatchReport {
    pub fn tiled_count(&self) -> usize {
        self.count(CaptureStatus::Tiled)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(CaptureStatus::Skipped)
    }

    fn count(&self, status: CaptureStatus) -> usize {
        self.captures.iter().filter(|c| c.status == status).count()
    }

    /// Tiles written across all captures.
    pub fn total_tiles(&self) -> usize {
        self.captures.iter().map(|c| c.tiles).sum()
    }

    /// Write the report as pretty JSON.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// List capture folders in configured source order, then by name.
///
/// Fails only when the input root itself is missing. A missing source
/// directory is logged and contributes no captures.
pub fn discover_captures(config: &TilingConfig) -> Result<Vec<CaptureTask>> {
    let input_root = &config.input_root;
    if !input_root.is_dir() {
        return Err(TilingError::Discovery {
            path: input_root.clone(),
            message: "input root is not a directory".to_string(),
        });
    }

    let mut tasks = Vec::new();
    for source in &config.sources {
        let dir = input_root.join(&source.directory);
        if !dir.is_dir() {
            warn!(source = %source.directory, path = %dir.display(), "Source directory not found, skipping");
            continue;
        }

        let before = tasks.len();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| TilingError::Discovery {
                path: dir.clone(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }

            tasks.push(CaptureTask {
                name: entry.file_name().to_string_lossy().into_owned(),
                root: entry.path().to_path_buf(),
                kind: source.kind,
            });
        }

        debug!(
            source = %source.directory,
            kind = %source.kind,
            captures = tasks.len() - before,
            "Scanned source directory"
        );
    }

    Ok(tasks)
}

/// Gather the folder-level facts of a capture.
///
/// Sensor geometry and geolocation only apply to raw strips.
pub fn gather_facts(manifest: &CaptureManifest) -> CaptureFacts {
    if manifest.kind.is_geocoded() {
        return CaptureFacts::without_sidecars(&manifest.name, manifest.kind);
    }

    let sensor = SensorGeometry::gather(
        &manifest.name,
        &manifest.solar_files,
        &manifest.attitude_files,
    );
    let grid = CoordinateGrid::load(&manifest.name, &manifest.ground_control_files);

    debug!(
        capture = %manifest.name,
        sensor_resolved = !sensor.is_empty(),
        grid_rows = grid.row_count(),
        "Gathered capture facts"
    );

    CaptureFacts {
        name: manifest.name.clone(),
        kind: manifest.kind,
        sensor,
        grid,
    }
}

/// Tile one capture and return the number of tiles written.
pub fn process_capture(
    task: &CaptureTask,
    engine: &TilingEngine,
    options: &CaptureOptions,
) -> Result<usize> {
    let manifest = CaptureManifest::discover(&task.root, task.kind, &options.rules)?;
    let facts = gather_facts(&manifest);
    let source = ImageSource::load(&manifest)?;

    let expected = engine.tile_count(source.size);
    if expected == 0 {
        warn!(
            capture = %task.name,
            size = %source.size,
            tile_size = engine.tile_size(),
            "Raster smaller than one tile"
        );
    }

    let writer = TileWriter::create(&options.output_root, &task.name, task.kind)?
        .with_png_previews(options.png_previews)
        .with_geokeys(source.geokeys.clone());

    let mut written = 0;
    for tile in engine.tiles(&source) {
        let record = TileRecord::fuse(&facts, &tile);
        if let Err(e) = writer.write(&tile, &record) {
            discard_partial_output(&task.name, writer.dir(), written);
            return Err(e);
        }
        written += 1;
    }

    info!(
        capture = %task.name,
        kind = %task.kind,
        size = %source.size,
        tiles = written,
        output = %writer.dir().display(),
        "Capture tiled"
    );

    Ok(written)
}

/// Remove a capture's output folder after a failed tile write, so a skipped
/// capture never leaves a partial tile set behind.
fn discard_partial_output(capture: &str, dir: &Path, written: usize) {
    match fs::remove_dir_all(dir) {
        Ok(()) => debug!(capture = %capture, discarded = written, "Removed partial capture output"),
        Err(e) => warn!(
            capture = %capture,
            path = %dir.display(),
            error = %e,
            "Failed to remove partial capture output"
        ),
    }
}

fn outcome_for(task: &CaptureTask, engine: &TilingEngine, options: &CaptureOptions) -> CaptureOutcome {
    match process_capture(task, engine, options) {
        Ok(tiles) => CaptureOutcome {
            name: task.name.clone(),
            kind: task.kind,
            status: CaptureStatus::Tiled,
            tiles,
            error: None,
        },
        Err(e) => {
            warn!(capture = %task.name, kind = %task.kind, error = %e, "Skipping capture");
            CaptureOutcome {
                name: task.name.clone(),
                kind: task.kind,
                status: CaptureStatus::Skipped,
                tiles: 0,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Tile every capture under the configured input root.
///
/// Fails only on invalid configuration or a missing input root; capture
/// failures are recorded in the report.
pub fn run_batch(config: &TilingConfig) -> Result<BatchReport> {
    config.validate()?;
    let started_at = Utc::now();

    let engine = TilingEngine::new(config.tile_size)?;
    let options = CaptureOptions::from_config(config);
    let tasks = discover_captures(config)?;

    info!(
        captures = tasks.len(),
        tile_size = config.tile_size,
        workers = config.workers,
        "Starting tiling run"
    );

    fs::create_dir_all(&config.output_root)?;

    let captures: Vec<CaptureOutcome> = if config.workers > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| TilingError::InvalidConfig(format!("failed to start worker pool: {e}")))?;
        pool.install(|| {
            tasks
                .par_iter()
                .map(|task| outcome_for(task, &engine, &options))
                .collect()
        })
    } else {
        tasks
            .iter()
            .map(|task| outcome_for(task, &engine, &options))
            .collect()
    };

    let report = BatchReport {
        started_at,
        finished_at: Utc::now(),
        tile_size: config.tile_size,
        captures,
    };

    info!(
        tiled = report.tiled_count(),
        skipped = report.skipped_count(),
        tiles = report.total_tiles(),
        "Tiling run complete"
    );

    if config.write_summary {
        let path = config.output_root.join(RUN_SUMMARY_FILE);
        report.write_to(&path)?;
        debug!(path = %path.display(), "Wrote run summary");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceDir;
    use test_utils::{create_test_strip, InputTree};

    fn config_for(tree: &InputTree, output: &Path) -> TilingConfig {
        TilingConfig {
            input_root: tree.path().to_path_buf(),
            output_root: output.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_discovery_order_and_kinds() {
        let tree = InputTree::new().unwrap();
        tree.capture("tmc", "tmc_b").unwrap();
        tree.capture("ohrc", "ohr_b").unwrap();
        tree.capture("ohrc", "ohr_a").unwrap();
        tree.capture("tmc", "tmc_a").unwrap();
        fs::write(tree.path().join("ohrc").join("stray.txt"), "x").unwrap();

        let out = tempfile::tempdir().unwrap();
        let tasks = discover_captures(&config_for(&tree, out.path())).unwrap();

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["ohr_a", "ohr_b", "tmc_a", "tmc_b"]);
        assert_eq!(tasks[0].kind, CaptureKind::RawStrip);
        assert_eq!(tasks[2].kind, CaptureKind::Orthoimage);
    }

    #[test]
    fn test_missing_input_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = TilingConfig {
            input_root: dir.path().join("absent"),
            ..Default::default()
        };
        assert!(matches!(
            discover_captures(&config),
            Err(TilingError::Discovery { .. })
        ));
    }

    #[test]
    fn test_custom_source_mapping() {
        let tree = InputTree::new().unwrap();
        tree.capture("dem_v2", "site_1").unwrap();

        let out = tempfile::tempdir().unwrap();
        let config = TilingConfig {
            sources: vec![SourceDir::new("dem_v2", CaptureKind::ElevationModel)],
            ..config_for(&tree, out.path())
        };

        let tasks = discover_captures(&config).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].kind, CaptureKind::ElevationModel);
    }

    #[test]
    fn test_invalid_config_fails_run() {
        let tree = InputTree::new().unwrap();
        let out = tempfile::tempdir().unwrap();
        let config = TilingConfig {
            tile_size: 0,
            ..config_for(&tree, out.path())
        };
        assert!(matches!(run_batch(&config), Err(TilingError::InvalidConfig(_))));
    }

    #[test]
    fn test_failed_tile_write_leaves_no_partial_output() {
        let tree = InputTree::new().unwrap();
        tree.capture("ohrc", "ohr_clash")
            .unwrap()
            .raw_image(&create_test_strip(128, 64))
            .unwrap()
            .size_label(128, 64)
            .unwrap();

        // The second tile's image path is taken by a directory.
        let out = tempfile::tempdir().unwrap();
        let capture_out = out.path().join("ohr_clash");
        fs::create_dir_all(capture_out.join("ohr_clash_patch_0001.img")).unwrap();

        let report = run_batch(&TilingConfig {
            tile_size: 64,
            ..config_for(&tree, out.path())
        })
        .unwrap();

        let outcome = &report.captures[0];
        assert_eq!(outcome.status, CaptureStatus::Skipped);
        assert_eq!(outcome.tiles, 0);
        assert!(outcome.error.is_some());
        assert!(!capture_out.exists());
    }

    #[test]
    fn test_report_counts() {
        let now = Utc::now();
        let report = BatchReport {
            started_at: now,
            finished_at: now,
            tile_size: 512,
            captures: vec![
                CaptureOutcome {
                    name: "a".into(),
                    kind: CaptureKind::RawStrip,
                    status: CaptureStatus::Tiled,
                    tiles: 4,
                    error: None,
                },
                CaptureOutcome {
                    name: "b".into(),
                    kind: CaptureKind::Orthoimage,
                    status: CaptureStatus::Skipped,
                    tiles: 0,
                    error: Some("boom".into()),
                },
            ],
        };

        assert_eq!(report.tiled_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.total_tiles(), 4);
    }
}
