//! Production implementation of `SimulatorLauncher` using a child process.

use crate::error::VizError;
use crate::simulator::SimulatorLauncher;
use crate::types::SimulationRequest;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs the simulator executable and waits for it to exit.
///
/// The working directory of the child is the one the snapshot files will be
/// written to, since the simulator uses the basename as a relative path.
pub struct ProcessLauncher {
    /// Path to the simulator executable
    program: PathBuf,

    /// Working directory for the child process
    working_dir: Option<PathBuf>,
}

impl ProcessLauncher {
    /// Creates a launcher for the given executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: None,
        }
    }

    /// Runs the child in `dir` instead of the current directory.
    ///
    /// A relative program path such as `./sed_simulator` is resolved against
    /// the caller's current directory first, so it keeps pointing at the same
    /// file once the child starts elsewhere. Bare names are left for `PATH`.
    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        if self.program.is_relative() && self.program.components().count() > 1 {
            match std::path::absolute(&self.program) {
                Ok(program) => self.program = program,
                Err(e) => tracing::warn!("Could not resolve {}: {}", self.program.display(), e),
            }
        }
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Returns the executable path.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::new("./sed_simulator")
    }
}

impl SimulatorLauncher for ProcessLauncher {
    fn launch(&self, request: &SimulationRequest) -> Result<(), VizError> {
        request.validate()?;

        let args = request.to_args();
        tracing::info!("Executing: {} {}", self.program.display(), args.join(" "));

        let mut command = Command::new(&self.program);
        command.args(&args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|e| VizError::ExternalProcess {
            program: self.program.display().to_string(),
            code: None,
            stderr: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            tracing::debug!("[simulator] {}", line);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!("Simulator failed: {}", stderr);
            return Err(VizError::ExternalProcess {
                program: self.program.display().to_string(),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(())
    }

    fn name(&self) -> String {
        self.program.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable_is_external_error() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = ProcessLauncher::new(dir.path().join("does_not_exist"));
        let result = launcher.launch(&SimulationRequest::default());
        assert!(matches!(
            result,
            Err(VizError::ExternalProcess { code: None, .. })
        ));
    }

    #[test]
    fn test_invalid_request_never_spawns() {
        let launcher = ProcessLauncher::new("/bin/true");
        let request = SimulationRequest {
            cycles: 0,
            ..Default::default()
        };
        assert!(matches!(
            launcher.launch(&request),
            Err(VizError::InvalidArgument(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_reported() {
        // `false` ignores its arguments and exits with status 1
        let launcher = ProcessLauncher::new("false");
        match launcher.launch(&SimulationRequest::default()) {
            Err(VizError::ExternalProcess { code, .. }) => assert_eq!(code, Some(1)),
            other => panic!("expected ExternalProcess, got {:?}", other),
        }
    }

    #[test]
    fn test_relative_program_survives_working_dir() {
        let cwd = std::env::current_dir().unwrap();

        let launcher = ProcessLauncher::new("./sed_simulator").in_dir("/tmp");
        assert!(launcher.program().is_absolute());
        assert!(launcher.program().starts_with(&cwd));
        assert!(launcher.program().ends_with("sed_simulator"));

        let nested = ProcessLauncher::new("bin/sim").in_dir("/tmp");
        assert_eq!(nested.program(), cwd.join("bin/sim"));
    }

    #[test]
    fn test_bare_and_absolute_programs_unchanged() {
        let bare = ProcessLauncher::new("sed_simulator").in_dir("/tmp");
        assert_eq!(bare.program(), Path::new("sed_simulator"));

        let absolute = ProcessLauncher::new("/opt/sed/sim").in_dir("/tmp");
        assert_eq!(absolute.program(), Path::new("/opt/sed/sim"));
    }

    #[cfg(unix)]
    #[test]
    fn test_bare_program_found_on_path_from_other_dir() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = ProcessLauncher::new("true").in_dir(dir.path());
        assert!(launcher.launch(&SimulationRequest::default()).is_ok());
    }
}
