//! Visualization Pipeline
//! ======================
//!
//! Chains the four stages for one run:
//!
//! ```text
//! load_run ──► GlobalScale::estimate ──► FrameRenderer (per snapshot) ──► assemble
//! ```
//!
//! Snapshots stay in memory between the scale pass and the render pass.
//! A frame that fails to render is logged and left out of the animation;
//! every other failure aborts the run.

use crate::assembler::{animation_path, assemble};
use crate::render::{FrameRenderer, RenderStyle, RenderedFrame};
use crate::scale::GlobalScale;
use crate::snapshot::{load_run, SkippedFile, Snapshot};
use rayon::prelude::*;
use sedlab_env::{ProgressEvent, ProgressSink, VizError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Basename the simulator uses when none is given.
pub const DEFAULT_BASENAME: &str = "sed_lab_sim";

/// Where frames and the animation go when not overridden.
pub const DEFAULT_OUTPUT_DIR: &str = "visualisations";

/// Inputs of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding `<basename>_cycle_<N>.csv`
    pub input_dir: PathBuf,
    /// Directory for frames and the animation (created if missing)
    pub output_dir: PathBuf,
    pub basename: String,
    pub style: RenderStyle,
    /// Render frames on the rayon pool
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            basename: DEFAULT_BASENAME.to_string(),
            style: RenderStyle::default(),
            parallel: true,
        }
    }
}

impl PipelineConfig {
    pub fn new(basename: impl Into<String>) -> Self {
        Self {
            basename: basename.into(),
            ..Self::default()
        }
    }

    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Final artifact location for this configuration.
    pub fn animation_path(&self) -> PathBuf {
        animation_path(&self.output_dir, &self.basename)
    }
}

/// Alive cell count of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle: u64,
    pub alive: usize,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub basename: String,
    pub artifact: PathBuf,
    /// Frames encoded into the animation
    pub frames: usize,
    /// Snapshot files found but not parsed
    pub skipped: Vec<SkippedFile>,
    /// Cycles whose frame could not be rendered
    pub failed_cycles: Vec<u64>,
    pub scale: GlobalScale,
    /// Rendered cycles in animation order
    pub cycles: Vec<CycleSummary>,
}

impl PipelineReport {
    /// Pretty JSON form.
    pub fn to_json(&self) -> Result<String, VizError> {
        serde_json::to_string_pretty(self).map_err(|e| VizError::encoding(e.to_string()))
    }

    /// Writes the JSON form to `path`.
    pub fn write_to_file(&self, path: &Path) -> Result<(), VizError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Runs the whole pipeline for one configuration.
///
/// A `Failed` event is emitted before any error is returned.
pub fn run_pipeline(
    config: &PipelineConfig,
    progress: &dyn ProgressSink,
) -> Result<PipelineReport, VizError> {
    let result = run_stages(config, progress);
    if let Err(e) = &result {
        progress.emit(ProgressEvent::Failed {
            message: e.to_string(),
        });
    }
    result
}

fn run_stages(
    config: &PipelineConfig,
    progress: &dyn ProgressSink,
) -> Result<PipelineReport, VizError> {
    tracing::info!(
        "Visualizing run '{}' from {} into {}",
        config.basename,
        config.input_dir.display(),
        config.output_dir.display()
    );

    progress.emit(ProgressEvent::Discovering {
        basename: config.basename.clone(),
    });
    let run = load_run(&config.input_dir, &config.basename)?;
    progress.emit(ProgressEvent::Loaded {
        parsed: run.snapshots.len(),
        skipped: run.skipped.len(),
    });

    progress.emit(ProgressEvent::EstimatingScale {
        snapshots: run.snapshots.len(),
    });
    let scale = GlobalScale::estimate(&run.snapshots);

    fs::create_dir_all(&config.output_dir)?;
    let renderer = FrameRenderer::new(&config.output_dir, &config.basename, config.style.clone());
    let (mut frames, failed_cycles) = render_all(&renderer, &run.snapshots, &scale, config.parallel, progress);
    frames.sort_by_key(|f| f.cycle);

    progress.emit(ProgressEvent::Assembling {
        frames: frames.len(),
    });
    let artifact = assemble(&frames, &config.animation_path())?;

    let cycles = frames
        .iter()
        .map(|f| CycleSummary {
            cycle: f.cycle,
            alive: f.points,
        })
        .collect();

    progress.emit(ProgressEvent::Finished {
        artifact: artifact.clone(),
    });

    Ok(PipelineReport {
        basename: run.basename,
        artifact,
        frames: frames.len(),
        skipped: run.skipped,
        failed_cycles,
        scale,
        cycles,
    })
}

/// Renders every snapshot, returning the written frames and the cycles
/// that failed.
fn render_all(
    renderer: &FrameRenderer,
    snapshots: &[Snapshot],
    scale: &GlobalScale,
    parallel: bool,
    progress: &dyn ProgressSink,
) -> (Vec<RenderedFrame>, Vec<u64>) {
    let total = snapshots.len();
    let done = AtomicUsize::new(0);

    let render_one = |snapshot: &Snapshot| -> Result<RenderedFrame, (u64, VizError)> {
        let frame = renderer
            .render(snapshot, scale)
            .map_err(|e| (snapshot.cycle, e))?;
        let done = done.fetch_add(1, Ordering::SeqCst) + 1;
        progress.emit(ProgressEvent::FrameRendered {
            done,
            total,
            cycle: frame.cycle,
        });
        Ok(frame)
    };

    let results: Vec<_> = if parallel {
        snapshots.par_iter().map(render_one).collect()
    } else {
        snapshots.iter().map(render_one).collect()
    };

    let mut frames = Vec::with_capacity(total);
    let mut failed = Vec::new();
    for result in results {
        match result {
            Ok(frame) => frames.push(frame),
            Err((cycle, e)) => {
                tracing::warn!("Frame for cycle {} skipped: {}", cycle, e);
                failed.push(cycle);
            }
        }
    }
    failed.sort_unstable();

    (frames, failed)
}
