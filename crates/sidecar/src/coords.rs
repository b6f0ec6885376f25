//! Sparse pixel → lon/lat lookup built from ground-control tables.
//!
//! Ground-control CSVs list sampled pixels of the strip with their
//! geographic position:
//!
//! ```text
//! Pixel,Scan,Longitude,Lattitude
//! 0,0,10.125,-45.5
//! 1000,0,10.250,-45.5
//! ```
//!
//! The latitude column appears as `Lattitude` in older products and as
//! `Latitude` in newer ones; the former is preferred when both exist.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use patch_common::LonLat;
use tracing::{debug, warn};

use crate::error::{Result, SidecarError};

const PIXEL_COLUMN: &str = "Pixel";
const SCAN_COLUMN: &str = "Scan";
const LONGITUDE_COLUMN: &str = "Longitude";
const LATITUDE_COLUMNS: [&str; 2] = ["Lattitude", "Latitude"];

/// Column positions of the fields we read.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    pixel: usize,
    scan: usize,
    lon: usize,
    lat: usize,
}

impl ColumnIndex {
    fn from_headers(path: &Path, headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &'static str| headers.iter().position(|h| h == name);
        let require = |name: &'static str| {
            find(name).ok_or_else(|| SidecarError::MissingColumn {
                path: path.to_path_buf(),
                column: name,
            })
        };

        let lat = LATITUDE_COLUMNS
            .iter()
            .find_map(|name| find(*name))
            .ok_or_else(|| SidecarError::MissingColumn {
                path: path.to_path_buf(),
                column: LATITUDE_COLUMNS[1],
            })?;

        Ok(Self {
            pixel: require(PIXEL_COLUMN)?,
            scan: require(SCAN_COLUMN)?,
            lon: require(LONGITUDE_COLUMN)?,
            lat,
        })
    }

    /// Parse one record into `(row, col, position)`.
    fn parse(&self, record: &csv::StringRecord) -> Option<(i64, i64, LonLat)> {
        let col = record.get(self.pixel)?.parse::<i64>().ok()?;
        let row = record.get(self.scan)?.parse::<i64>().ok()?;
        let lon = record.get(self.lon)?.parse::<f64>().ok()?;
        let lat = record.get(self.lat)?.parse::<f64>().ok()?;
        Some((row, col, LonLat::new(lon, lat)))
    }
}

/// Sparse row → column → position table.
///
/// Rows need not be contiguous or evenly spaced. The grid is read-only once
/// built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateGrid {
    rows: BTreeMap<i64, BTreeMap<i64, LonLat>>,
}

impl CoordinateGrid {
    /// Build from `(row, col, position)` samples. Later samples overwrite
    /// earlier ones at the same pixel.
    pub fn from_samples(samples: impl IntoIterator<Item = (i64, i64, LonLat)>) -> Self {
        let mut rows: BTreeMap<i64, BTreeMap<i64, LonLat>> = BTreeMap::new();
        for (row, col, pos) in samples {
            rows.entry(row).or_default().insert(col, pos);
        }
        Self { rows }
    }

    /// Build from every ground-control file of a capture.
    ///
    /// Unreadable files and files without the required columns are logged
    /// and skipped; malformed rows are skipped individually.
    pub fn load(capture: &str, files: &[PathBuf]) -> Self {
        let mut grid = Self::default();
        for path in files {
            match grid.read_file(path) {
                Ok((accepted, skipped)) => {
                    debug!(
                        capture = %capture,
                        path = %path.display(),
                        accepted,
                        skipped,
                        "Loaded ground-control points"
                    );
                }
                Err(e) => {
                    warn!(capture = %capture, path = %path.display(), error = %e, "Skipping ground-control file");
                }
            }
        }
        grid
    }

    /// Merge one CSV file into the grid. Returns `(accepted, skipped)` row
    /// counts.
    fn read_file(&mut self, path: &Path) -> Result<(usize, usize)> {
        let file = File::open(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let columns = ColumnIndex::from_headers(path, reader.headers()?)?;

        let mut accepted = 0;
        let mut skipped = 0;
        for record in reader.records() {
            match record.ok().as_ref().and_then(|r| columns.parse(r)) {
                Some((row, col, pos)) => {
                    self.rows.entry(row).or_default().insert(col, pos);
                    accepted += 1;
                }
                None => skipped += 1,
            }
        }
        Ok((accepted, skipped))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of distinct rows with samples.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Geographic position of pixel `(x, y)`.
    ///
    /// An unknown row `y` falls back to the nearest sampled row (the lower
    /// one on a tie). Within the row, exact columns are returned as stored
    /// and other columns are linearly interpolated between their sampled
    /// neighbours. Columns outside the row's sampled range are not
    /// extrapolated and yield `None`, as does an empty grid.
    pub fn lookup(&self, x: i64, y: i64) -> Option<LonLat> {
        let line = match self.rows.get(&y) {
            Some(line) => line,
            None => self.nearest_row(y)?,
        };

        if let Some(pos) = line.get(&x) {
            return Some(*pos);
        }

        let below = line.range(..x).next_back();
        let above = line.range(x..).next();
        match (below, above) {
            (Some((&x0, p0)), Some((&x1, p1))) => {
                // Widened so distant sample columns cannot overflow.
                let ratio = (i128::from(x) - i128::from(x0)) as f64
                    / (i128::from(x1) - i128::from(x0)) as f64;
                Some(p0.lerp(p1, ratio))
            }
            _ => None,
        }
    }

    fn nearest_row(&self, y: i64) -> Option<&BTreeMap<i64, LonLat>> {
        self.rows
            .iter()
            .min_by_key(|(row, _)| row.abs_diff(y))
            .map(|(_, line)| line)
    }
}
