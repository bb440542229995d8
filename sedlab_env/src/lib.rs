//! SED-Lab Environment Abstraction Layer
//!
//! This crate holds the seams between the visualization core and the world
//! around it, so the core never depends on a particular UI or process model:
//!
//! - **Progress**: staged status events pushed into a caller-supplied sink
//! - **Simulator**: the external engine that writes snapshot files
//! - **Errors**: the shared failure taxonomy
//!
//! # Example
//!
//! ```ignore
//! use sedlab_env::{ProcessLauncher, SimulationRequest, SimulatorLauncher, TracingProgress};
//!
//! let launcher = ProcessLauncher::new("./sed_simulator");
//! launcher.launch(&SimulationRequest::default())?;
//! ```

mod error;
mod process_impl;
mod progress;
mod simulator;
mod types;

pub use error::VizError;
pub use process_impl::ProcessLauncher;
pub use progress::{NullProgress, ProgressEvent, ProgressSink, RecordingProgress, TracingProgress};
pub use simulator::SimulatorLauncher;
pub use types::SimulationRequest;
