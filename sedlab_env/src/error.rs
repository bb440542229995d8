//! Error types for the SED-Lab visualization pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur anywhere in the pipeline or its collaborators.
///
/// File-level variants (`Parse`, `Render`) are recovered locally by the
/// pipeline; the others abort a run.
#[derive(Debug, Error)]
pub enum VizError {
    /// No snapshot file matched `<basename>_cycle_<N>.csv`
    #[error("No snapshot files found for '{basename}' in {}", .dir.display())]
    NotFound { basename: String, dir: PathBuf },

    /// A snapshot file is unreadable or malformed
    #[error("Failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    /// A single frame could not be rasterized
    #[error("Failed to render cycle {cycle}: {reason}")]
    Render { cycle: u64, reason: String },

    /// No frames to assemble, or the encoder failed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The external simulator exited with a failure status
    #[error("{program} exited with {}: {stderr}", .code.map_or_else(|| "signal".to_string(), |c| format!("code {}", c)))]
    ExternalProcess {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A request or parameter is out of its accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A `KEY=value` configuration line is malformed
    #[error("Config error at line {line}: {reason}")]
    Config { line: usize, reason: String },

    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VizError {
    /// Creates a parse error for the given file.
    pub fn parse(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a render error for the given cycle.
    pub fn render(cycle: u64, reason: impl std::fmt::Display) -> Self {
        Self::Render {
            cycle,
            reason: reason.to_string(),
        }
    }

    /// Creates an encoding error.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Creates an invalid-argument error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Returns true if the pipeline can continue past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Render { .. })
    }
}
