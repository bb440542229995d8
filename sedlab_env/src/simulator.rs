//! Abstraction over the external simulation engine.

use crate::error::VizError;
use crate::types::SimulationRequest;

/// Something that can produce snapshot files for a [`SimulationRequest`].
///
/// # Implementations
///
/// - **Production**: `ProcessLauncher` - runs the simulator executable
/// - **Tests**: any closure or stub writing CSV files directly
///
/// A launcher returns `Err(VizError::ExternalProcess)` when the engine
/// reports failure; the caller must treat that as fatal and not start the
/// visualization pipeline.
pub trait SimulatorLauncher: Send + Sync {
    /// Runs one simulation to completion.
    fn launch(&self, request: &SimulationRequest) -> Result<(), VizError>;

    /// Human-readable name of the engine (for status lines).
    fn name(&self) -> String;
}
