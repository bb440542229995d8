//! Full run - law file, simulator, then visualization.

use sedlab_core::{run_pipeline, LawParameters, PipelineConfig, PipelineReport};
use sedlab_env::{ProgressEvent, ProgressSink, SimulationRequest, SimulatorLauncher, VizError};
use std::path::PathBuf;
use tracing::{error, info};

/// Drives one simulation and visualizes its output.
///
/// The law file is written under the pipeline's input directory, which is
/// also where the simulator is expected to run and write its snapshots.
pub struct FullRunner {
    /// Simulator arguments
    request: SimulationRequest,

    /// Laws written to `request.config_path`
    laws: LawParameters,

    /// Visualization settings; its basename follows the request
    pipeline: PipelineConfig,
}

impl FullRunner {
    /// Creates a runner with default laws and pipeline settings.
    pub fn new(request: SimulationRequest) -> Self {
        let pipeline = PipelineConfig::new(request.basename.clone());
        Self {
            request,
            laws: LawParameters::default(),
            pipeline,
        }
    }

    /// Sets the law parameters.
    pub fn with_laws(mut self, laws: LawParameters) -> Self {
        self.laws = laws;
        self
    }

    /// Sets the pipeline configuration. The basename is kept in sync with
    /// the request.
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = PipelineConfig {
            basename: self.request.basename.clone(),
            ..pipeline
        };
        self
    }

    pub fn request(&self) -> &SimulationRequest {
        &self.request
    }

    pub fn laws(&self) -> &LawParameters {
        &self.laws
    }

    /// Where the law file lands on disk.
    pub fn config_file(&self) -> PathBuf {
        self.pipeline.input_dir.join(&self.request.config_path)
    }

    /// Runs every step. A simulator failure stops the run before any
    /// snapshot is read.
    pub fn run(
        &self,
        launcher: &dyn SimulatorLauncher,
        progress: &dyn ProgressSink,
    ) -> Result<PipelineReport, VizError> {
        let result = self.prepare_and_simulate(launcher, progress);
        if let Err(e) = result {
            error!("Run aborted: {}", e);
            progress.emit(ProgressEvent::Failed {
                message: e.to_string(),
            });
            return Err(e);
        }

        run_pipeline(&self.pipeline, progress)
    }

    fn prepare_and_simulate(
        &self,
        launcher: &dyn SimulatorLauncher,
        progress: &dyn ProgressSink,
    ) -> Result<(), VizError> {
        self.request.validate()?;
        self.laws.validate()?;

        let config_file = self.config_file();
        progress.emit(ProgressEvent::WritingConfig {
            path: config_file.clone(),
        });
        self.laws.write_to_file(&config_file)?;

        progress.emit(ProgressEvent::LaunchingSimulator {
            program: launcher.name(),
        });
        launcher.launch(&self.request)?;
        info!("Simulation '{}' finished", self.request.basename);
        Ok(())
    }
}
