//! SED-Lab command line harness
//!
//! Everything around the visualization pipeline that needs a process or
//! randomness:
//!
//! - **Full runs**: write the law file, launch the simulator, visualize
//! - **Synthetic runs**: seeded snapshot generation without the simulator
//! - **Export**: JSON record of what produced an animation
//!
//! # Usage
//!
//! ```ignore
//! use sedlab_env::{ProcessLauncher, SimulationRequest, TracingProgress};
//! use sedlab_sim::FullRunner;
//!
//! let report = FullRunner::new(SimulationRequest::default())
//!     .run(&ProcessLauncher::default(), &TracingProgress)?;
//! println!("{}", report.artifact.display());
//! ```

mod exporter;
mod runner;
pub mod synth;

pub use exporter::{RunExport, RunSource};
pub use runner::FullRunner;
pub use synth::{generate, SynthConfig, SyntheticWorld};
