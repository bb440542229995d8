//! Common types shared between the pipeline and its collaborators.

use crate::error::VizError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Parameters for one invocation of the external simulator.
///
/// The simulator takes them positionally:
/// `<size_x> <size_y> <size_z> <cycles> <initial_density> <output_basename> <config_file>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Grid dimensions (X, Y, Z)
    pub size: [u32; 3],

    /// Number of simulation cycles to run
    pub cycles: u32,

    /// Probability in [0, 1] that a cell starts alive
    pub initial_density: f64,

    /// Basename shared by every snapshot file of the run
    pub basename: String,

    /// Path of the `KEY=value` law parameter file
    pub config_path: PathBuf,
}

impl Default for SimulationRequest {
    fn default() -> Self {
        Self {
            size: [16, 16, 16],
            cycles: 50,
            initial_density: 0.1,
            basename: "sed_lab_sim".to_string(),
            config_path: PathBuf::from("sed_lab_params.conf"),
        }
    }
}

impl SimulationRequest {
    /// Checks the same bounds the simulator enforces on its arguments.
    pub fn validate(&self) -> Result<(), VizError> {
        if self.size.iter().any(|&s| s == 0) {
            return Err(VizError::invalid(format!(
                "grid dimensions must be positive, got {:?}",
                self.size
            )));
        }
        if self.cycles == 0 {
            return Err(VizError::invalid("cycle count must be positive"));
        }
        if !(0.0..=1.0).contains(&self.initial_density) {
            return Err(VizError::invalid(format!(
                "initial density must be in [0, 1], got {}",
                self.initial_density
            )));
        }
        if self.basename.is_empty() || self.basename.contains(['/', '\\']) {
            return Err(VizError::invalid(format!(
                "basename must be a plain file prefix, got '{}'",
                self.basename
            )));
        }
        Ok(())
    }

    /// Returns the positional argument list for the simulator.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            self.size[0].to_string(),
            self.size[1].to_string(),
            self.size[2].to_string(),
            self.cycles.to_string(),
            self.initial_density.to_string(),
            self.basename.clone(),
            self.config_path.display().to_string(),
        ]
    }
}
