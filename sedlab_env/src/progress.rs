//! Staged progress reporting.
//!
//! The pipeline never touches a UI directly. Every stage emits a
//! [`ProgressEvent`] into a [`ProgressSink`] supplied by the caller; the
//! event's `Display` form is the short status line a UI would show.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

/// One step of a pipeline or full-run invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProgressEvent {
    /// Law parameter file is being written
    WritingConfig { path: PathBuf },

    /// External simulator is starting
    LaunchingSimulator { program: String },

    /// Searching the input directory for snapshot files
    Discovering { basename: String },

    /// Snapshot files found and parsed
    Loaded { parsed: usize, skipped: usize },

    /// Global scale pass running over all snapshots
    EstimatingScale { snapshots: usize },

    /// One frame written (`done` counts completed frames, in any order)
    FrameRendered { done: usize, total: usize, cycle: u64 },

    /// Frames are being encoded into the animation
    Assembling { frames: usize },

    /// Animation written
    Finished { artifact: PathBuf },

    /// The run aborted
    Failed { message: String },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WritingConfig { path } => {
                write!(f, "Writing configuration to {}...", path.display())
            }
            Self::LaunchingSimulator { program } => write!(f, "Running simulator {}...", program),
            Self::Discovering { basename } => {
                write!(f, "Visualisation: searching CSV files for '{}'...", basename)
            }
            Self::Loaded { parsed, skipped } => {
                write!(f, "Visualisation: {} snapshots loaded ({} skipped)", parsed, skipped)
            }
            Self::EstimatingScale { snapshots } => {
                write!(f, "Visualisation: computing global scales over {} snapshots...", snapshots)
            }
            Self::FrameRendered { done, total, cycle } => {
                write!(f, "Visualisation: image {}/{} rendered (cycle {})", done, total, cycle)
            }
            Self::Assembling { frames } => {
                write!(f, "Visualisation: assembling GIF from {} frames...", frames)
            }
            Self::Finished { artifact } => write!(f, "Done! GIF saved to {}", artifact.display()),
            Self::Failed { message } => write!(f, "Error: {}", message),
        }
    }
}

/// Receiver of progress events.
///
/// Must be `Sync`: frames may be rendered on several threads at once.
pub trait ProgressSink: Send + Sync {
    /// Handles one event.
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Forwards events to `tracing` at INFO level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn emit(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::Failed { .. } => tracing::error!("{}", event),
            ProgressEvent::FrameRendered { .. } => tracing::debug!("{}", event),
            _ => tracing::info!("{}", event),
        }
    }
}

/// Keeps every event in memory.
///
/// Useful for a UI that polls the latest status line, and for tests.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all events received so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns the status line of the most recent event.
    pub fn latest_status(&self) -> Option<String> {
        self.events
            .lock()
            .ok()
            .and_then(|events| events.last().map(|e| e.to_string()))
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
