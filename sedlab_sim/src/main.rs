//! SED-Lab CLI
//!
//! Visualize snapshot files, run the simulator end to end, or generate a
//! synthetic run.

use clap::{Args, Parser, Subcommand};
use sedlab_core::{run_pipeline, LawParameters, PipelineConfig, PipelineReport, RenderStyle};
use sedlab_env::{ProcessLauncher, SimulationRequest, SimulatorLauncher, TracingProgress, VizError};
use sedlab_sim::{generate, FullRunner, RunExport, RunSource, SynthConfig};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// SED-Lab visualization pipeline
#[derive(Parser, Debug)]
#[command(name = "sedlab", version)]
#[command(about = "Turn SED simulation snapshots into an animated 3D GIF", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the run report as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Also write the run export (source + report) to this file
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Visualize snapshot files already on disk
    Render {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Write the law file, run the simulator, then visualize
    Run {
        #[command(flatten)]
        grid: GridArgs,

        /// Simulator executable
        #[arg(long, default_value = "./sed_simulator")]
        simulator: PathBuf,

        /// Start from the laws in this file instead of the defaults
        #[arg(long)]
        laws: Option<PathBuf>,

        /// Override one law, e.g. `--set K_E=1.5` (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,

        /// Name of the law file the simulator reads
        #[arg(long, default_value = "sed_lab_params.conf")]
        config_file: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Generate synthetic snapshot files (and optionally visualize them)
    Synth {
        #[command(flatten)]
        grid: GridArgs,

        /// Master seed for determinism
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Cycles between two snapshot files
        #[arg(long, default_value = "10")]
        interval: u32,

        /// Render the generated run right away
        #[arg(long)]
        render: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[derive(Args, Debug)]
struct GridArgs {
    /// Grid size X Y Z
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], default_values_t = [16u32, 16, 16])]
    size: Vec<u32>,

    /// Number of simulation cycles
    #[arg(short, long, default_value = "50")]
    cycles: u32,

    /// Initial cell density in [0, 1]
    #[arg(short, long, default_value = "0.1")]
    density: f64,
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Directory holding the snapshot files
    #[arg(short, long, default_value = ".")]
    input_dir: PathBuf,

    /// Directory for frames and the animation
    #[arg(short, long, default_value = "visualisations")]
    output_dir: PathBuf,

    /// Basename of the run (`<basename>_cycle_<N>.csv`)
    #[arg(short, long, default_value = "sed_lab_sim")]
    basename: String,

    /// Frame width in pixels
    #[arg(long, default_value = "800")]
    width: u32,

    /// Frame height in pixels
    #[arg(long, default_value = "800")]
    height: u32,

    /// Draw frames without any text
    #[arg(long)]
    plain: bool,

    /// Render frames one at a time
    #[arg(long)]
    sequential: bool,
}

impl PipelineArgs {
    fn to_config(&self) -> PipelineConfig {
        let style = if self.plain {
            RenderStyle::plain()
        } else {
            RenderStyle::default()
        };
        PipelineConfig::new(self.basename.clone())
            .with_input_dir(&self.input_dir)
            .with_output_dir(&self.output_dir)
            .with_style(style.with_size(self.width, self.height))
            .with_parallel(!self.sequential)
    }
}

impl GridArgs {
    fn to_request(&self, basename: &str, config_path: PathBuf) -> Result<SimulationRequest, VizError> {
        let size: [u32; 3] = self
            .size
            .as_slice()
            .try_into()
            .map_err(|_| VizError::invalid("--size takes exactly three values"))?;
        Ok(SimulationRequest {
            size,
            cycles: self.cycles,
            initial_density: self.density,
            basename: basename.to_string(),
            config_path,
        })
    }
}

fn load_laws(base: Option<&PathBuf>, overrides: &[String]) -> Result<LawParameters, VizError> {
    let mut laws = match base {
        Some(path) => LawParameters::from_file(path)?,
        None => LawParameters::default(),
    };
    for (i, pair) in overrides.iter().enumerate() {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| VizError::invalid(format!("--set expects KEY=VALUE, got '{}'", pair)))?;
        laws.set(key.trim(), value.trim())
            .map_err(|reason| VizError::Config { line: i + 1, reason })?;
    }
    Ok(laws)
}

/// Runs one subcommand. `None` means nothing was visualized.
fn execute(command: &Command) -> Result<Option<(PipelineReport, RunSource)>, VizError> {
    let progress = TracingProgress;

    match command {
        Command::Render { pipeline } => {
            let report = run_pipeline(&pipeline.to_config(), &progress)?;
            Ok(Some((report, RunSource::Existing)))
        }

        Command::Run {
            grid,
            simulator,
            laws,
            overrides,
            config_file,
            pipeline,
        } => {
            let laws = load_laws(laws.as_ref(), overrides)?;
            let request = grid.to_request(&pipeline.basename, config_file.clone())?;
            let launcher = ProcessLauncher::new(simulator).in_dir(&pipeline.input_dir);

            let report = FullRunner::new(request.clone())
                .with_laws(laws)
                .with_pipeline(pipeline.to_config())
                .run(&launcher, &progress)?;

            let source = RunSource::Simulator {
                program: launcher.name(),
                request,
                laws,
            };
            Ok(Some((report, source)))
        }

        Command::Synth {
            grid,
            seed,
            interval,
            render,
            pipeline,
        } => {
            let request = grid.to_request(&pipeline.basename, PathBuf::new())?;
            let config = SynthConfig {
                seed: *seed,
                request: request.clone(),
                export_interval: *interval,
                ..SynthConfig::default()
            };
            let written = generate(&config, &pipeline.input_dir)?;
            info!("Wrote {} snapshot files to {}", written.len(), pipeline.input_dir.display());

            if !render {
                return Ok(None);
            }

            let report = run_pipeline(&pipeline.to_config(), &progress)?;
            Ok(Some((report, RunSource::Synthetic { seed: *seed, request })))
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging (stderr, so --json output stays clean)
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    info!("SED-Lab v{}", env!("CARGO_PKG_VERSION"));

    let (report, source) = match execute(&cli.command) {
        Ok(Some(outcome)) => outcome,
        Ok(None) => return,
        Err(e) => {
            error!("✗ {}", e);
            std::process::exit(1);
        }
    };

    if !report.failed_cycles.is_empty() {
        error!("{} frames could not be rendered: {:?}", report.failed_cycles.len(), report.failed_cycles);
    }
    info!(
        "✓ {} frames from {} snapshots -> {}",
        report.frames,
        report.scale.snapshots(),
        report.artifact.display()
    );

    let export = RunExport::new(source, report);

    if cli.json {
        match export.report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some(path) = &cli.report {
        if let Err(e) = export.write_to_file(path) {
            error!("Failed to write export: {:?}", e);
            std::process::exit(1);
        }
        info!("Exported run to {}", path.display());
    }
}
