//! JSON export of a finished run.
//!
//! Bundles what produced an animation (simulator request, laws, synthetic
//! seed) with the pipeline report, for archiving next to the GIF.

use sedlab_core::{LawParameters, PipelineReport};
use sedlab_env::SimulationRequest;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// How the snapshot files were produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunSource {
    /// Files already on disk
    Existing,

    /// External simulator run
    Simulator {
        program: String,
        request: SimulationRequest,
        laws: LawParameters,
    },

    /// Synthetic generator
    Synthetic {
        seed: u64,
        request: SimulationRequest,
    },
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    /// Tool version that wrote the export
    pub version: String,

    pub source: RunSource,

    pub report: PipelineReport,
}

impl RunExport {
    /// Creates a new export container.
    pub fn new(source: RunSource, report: PipelineReport) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            source,
            report,
        }
    }

    /// Pretty JSON form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
