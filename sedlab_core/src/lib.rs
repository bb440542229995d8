//! SED-Lab Core - Offline Visualization Pipeline
//!
//! Turns the snapshot files a SED simulation run writes into one animated
//! 3D scatter GIF. Four stages run in order:
//!
//! 1. **Snapshot Loader** ([`snapshot`]): discovers `<basename>_cycle_<N>.csv`
//!    and parses each file, skipping malformed ones
//! 2. **Global Scale Estimator** ([`scale`]): run-wide bounds so every frame
//!    shares its axes, colors and marker sizes
//! 3. **Frame Renderer** ([`render`]): one PNG per snapshot
//! 4. **Sequence Assembler** ([`assembler`]): looping GIF, frames removed
//!
//! [`pipeline::run_pipeline`] chains the stages and reports progress through
//! a [`sedlab_env::ProgressSink`]. [`laws`] holds the parameter file the
//! simulator reads.

pub mod assembler;
pub mod colormap;
pub mod laws;
pub mod pipeline;
pub mod render;
pub mod scale;
pub mod snapshot;

// Re-export key types for convenience
pub use assembler::{animation_path, assemble};
pub use laws::LawParameters;
pub use pipeline::{run_pipeline, CycleSummary, PipelineConfig, PipelineReport};
pub use render::{FrameRenderer, FrameScene, RenderStyle, RenderedFrame};
pub use scale::GlobalScale;
pub use snapshot::{discover, load_run, parse_snapshot, LoadedRun, Snapshot, SnapshotRecord};
