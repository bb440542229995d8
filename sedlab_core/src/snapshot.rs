//! Snapshot Loader
//! ===============
//!
//! Finds the per-cycle CSV files of one run and parses them.
//!
//! A run is identified by its basename: every file named
//! `<basename>_cycle_<N>.csv` in the input directory belongs to it. Files are
//! returned in natural order of `N` (cycle 2 before cycle 10), which is
//! simply numeric order since `N` is parsed.
//!
//! Parsing is per file and never fatal for the run: a malformed file is
//! logged and skipped by [`load_run`], and is then absent from both the scale
//! pass and the render pass.

use nalgebra::Vector3;
use sedlab_env::VizError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Columns every snapshot file must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = ["x", "y", "z", "E", "C"];

const CYCLE_INFIX: &str = "_cycle_";
const CSV_SUFFIX: &str = ".csv";

// =============================================================================
// RECORDS
// =============================================================================

/// One cell of the simulated world at a given cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Grid position (x, y, z)
    pub position: Vector3<f64>,
    /// Energy `E`
    pub energy: f64,
    /// Emotional charge `C`
    pub charge: f64,
}

impl SnapshotRecord {
    pub fn new(x: f64, y: f64, z: f64, energy: f64, charge: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            energy,
            charge,
        }
    }

    /// A cell is alive iff its energy is strictly positive.
    pub fn is_alive(&self) -> bool {
        self.energy > 0.0
    }
}

/// Row layout of the CSV files. Extra columns are ignored.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    x: f64,
    y: f64,
    z: f64,
    #[serde(rename = "E")]
    energy: f64,
    #[serde(rename = "C")]
    charge: f64,
}

impl From<CsvRow> for SnapshotRecord {
    fn from(row: CsvRow) -> Self {
        Self::new(row.x, row.y, row.z, row.energy, row.charge)
    }
}

impl From<&SnapshotRecord> for CsvRow {
    fn from(record: &SnapshotRecord) -> Self {
        Self {
            x: record.position.x,
            y: record.position.y,
            z: record.position.z,
            energy: record.energy,
            charge: record.charge,
        }
    }
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// A snapshot file found on disk but not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub cycle: u64,
    pub path: PathBuf,
}

/// Parsed contents of one per-cycle file.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Cycle index taken from the file name
    pub cycle: u64,
    /// File the records were read from
    pub source: PathBuf,
    /// All rows, alive or not, in file order
    pub records: Vec<SnapshotRecord>,
}

impl Snapshot {
    /// Iterates over alive records only.
    pub fn alive(&self) -> impl Iterator<Item = &SnapshotRecord> + '_ {
        self.records.iter().filter(|r| r.is_alive())
    }

    pub fn alive_count(&self) -> usize {
        self.alive().count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A file that was found but could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Every snapshot of one run that parsed successfully, in cycle order.
#[derive(Debug, Clone)]
pub struct LoadedRun {
    pub basename: String,
    pub snapshots: Vec<Snapshot>,
    pub skipped: Vec<SkippedFile>,
}

// =============================================================================
// DISCOVERY
// =============================================================================

/// Extracts `N` from `<basename>_cycle_<N>.csv`.
///
/// Returns `None` for any other name, including files of a different run
/// whose basename merely starts with this one.
pub fn parse_cycle(file_name: &str, basename: &str) -> Option<u64> {
    let digits = file_name
        .strip_prefix(basename)?
        .strip_prefix(CYCLE_INFIX)?
        .strip_suffix(CSV_SUFFIX)?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Returns the canonical file name for a cycle of a run.
pub fn snapshot_file_name(basename: &str, cycle: u64) -> String {
    format!("{}{}{}{}", basename, CYCLE_INFIX, cycle, CSV_SUFFIX)
}

/// Lists the snapshot files of `basename` in `dir`, ordered by cycle.
///
/// Fails with [`VizError::NotFound`] when nothing matches, including when
/// `dir` itself does not exist.
pub fn discover(dir: &Path, basename: &str) -> Result<Vec<SnapshotFile>, VizError> {
    let not_found = || VizError::NotFound {
        basename: basename.to_string(),
        dir: dir.to_path_buf(),
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(cycle) = parse_cycle(name, basename) {
            if entry.file_type()?.is_file() {
                files.push(SnapshotFile {
                    cycle,
                    path: entry.path(),
                });
            }
        }
    }

    if files.is_empty() {
        return Err(not_found());
    }

    // `cycle_07` and `cycle_7` both parse to 7; the path keeps the order total
    files.sort_by(|a, b| a.cycle.cmp(&b.cycle).then_with(|| a.path.cmp(&b.path)));
    tracing::debug!("Found {} snapshot files for '{}'", files.len(), basename);
    Ok(files)
}

// =============================================================================
// PARSING
// =============================================================================

/// Parses one snapshot file.
///
/// A header-only file is a valid, empty snapshot. A file without a header,
/// with a missing column or with a non-numeric cell is a
/// [`VizError::Parse`].
pub fn parse_snapshot(file: &SnapshotFile) -> Result<Snapshot, VizError> {
    let path = &file.path;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| VizError::parse(path, e))?;

    let headers = reader.headers().map_err(|e| VizError::parse(path, e))?;
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|col| !headers.iter().any(|h| h == **col))
    {
        return Err(VizError::parse(path, format!("missing column '{}'", missing)));
    }

    let mut records = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(|e| VizError::parse(path, e))?;
        records.push(SnapshotRecord::from(row));
    }

    Ok(Snapshot {
        cycle: file.cycle,
        source: path.clone(),
        records,
    })
}

/// Discovers and parses every snapshot of a run.
///
/// Only discovery failures are returned as errors; per-file parse failures
/// are collected in [`LoadedRun::skipped`].
pub fn load_run(dir: &Path, basename: &str) -> Result<LoadedRun, VizError> {
    let files = discover(dir, basename)?;

    let mut snapshots = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();

    for file in &files {
        match parse_snapshot(file) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                tracing::warn!("Skipping snapshot: {}", e);
                skipped.push(SkippedFile {
                    path: file.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Loaded {} snapshots for '{}' ({} skipped)",
        snapshots.len(),
        basename,
        skipped.len()
    );

    Ok(LoadedRun {
        basename: basename.to_string(),
        snapshots,
        skipped,
    })
}

/// Writes records in the snapshot file format (`x,y,z,E,C`).
pub fn write_snapshot(path: &Path, records: &[SnapshotRecord]) -> Result<(), VizError> {
    let io_err = |e: csv::Error| VizError::Io(io::Error::new(io::ErrorKind::Other, e));

    let mut writer = csv::Writer::from_path(path).map_err(io_err)?;
    if records.is_empty() {
        writer.write_record(REQUIRED_COLUMNS).map_err(io_err)?;
    }
    for record in records {
        writer.serialize(CsvRow::from(record)).map_err(io_err)?;
    }
    writer.flush()?;
    Ok(())
}
