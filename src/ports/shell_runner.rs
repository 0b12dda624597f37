//! Shell execution port.

use std::io;
use std::path::Path;

use thiserror::Error;

/// Captured result of a finished (or timed-out) command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Error)]
pub enum ShellError {
    /// No usable shell was configured or found on PATH.
    #[error("no usable shell found (tried {})", .tried.join(", "))]
    NoShell { tried: Vec<String> },

    #[error("invalid shell '{spec}': {details}")]
    InvalidShell { spec: String, details: String },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The deadline passed; the whole process group was killed. `output`
    /// holds what was captured before the kill.
    #[error("command timed out after {seconds}s")]
    TimedOut { seconds: u64, output: ShellOutput },

    #[error("failed waiting for command: {0}")]
    Wait(#[source] io::Error),
}

/// Port for running a command string through a shell.
pub trait ShellRunner {
    /// Run `command` with `shell` (or the runner's default) under `timeout_secs`.
    ///
    /// A non-zero exit is reported through [`ShellOutput::exit_code`], not as an error.
    fn run(
        &self,
        command: &str,
        working_dir: Option<&Path>,
        shell: Option<&str>,
        timeout_secs: u64,
    ) -> Result<ShellOutput, ShellError>;
}
