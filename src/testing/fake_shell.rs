use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::ports::{ShellError, ShellOutput, ShellRunner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRun {
    pub command: String,
    pub working_dir: Option<PathBuf>,
    pub shell: Option<String>,
    pub timeout_secs: u64,
}

enum Scripted {
    Output(ShellOutput),
    TimedOut(ShellOutput),
}

/// Shell runner that answers from a script and records every call.
#[derive(Clone, Default)]
pub struct FakeShellRunner {
    responses: Arc<Mutex<HashMap<String, Scripted>>>,
    runs: Arc<Mutex<Vec<RecordedRun>>>,
}

impl FakeShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdout(self, command: &str, stdout: &str) -> Self {
        let output =
            ShellOutput { stdout: stdout.to_string(), exit_code: Some(0), ..Default::default() };
        self.responses.lock().unwrap().insert(command.to_string(), Scripted::Output(output));
        self
    }

    pub fn with_output(self, command: &str, output: ShellOutput) -> Self {
        self.responses.lock().unwrap().insert(command.to_string(), Scripted::Output(output));
        self
    }

    pub fn with_timeout(self, command: &str, partial_stdout: &str) -> Self {
        let output = ShellOutput {
            stdout: partial_stdout.to_string(),
            timed_out: true,
            ..Default::default()
        };
        self.responses.lock().unwrap().insert(command.to_string(), Scripted::TimedOut(output));
        self
    }

    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs.lock().unwrap().clone()
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }
}

impl ShellRunner for FakeShellRunner {
    fn run(
        &self,
        command: &str,
        working_dir: Option<&Path>,
        shell: Option<&str>,
        timeout_secs: u64,
    ) -> Result<ShellOutput, ShellError> {
        self.runs.lock().unwrap().push(RecordedRun {
            command: command.to_string(),
            working_dir: working_dir.map(Path::to_path_buf),
            shell: shell.map(String::from),
            timeout_secs,
        });

        match self.responses.lock().unwrap().get(command) {
            Some(Scripted::Output(output)) => Ok(output.clone()),
            Some(Scripted::TimedOut(output)) => {
                Err(ShellError::TimedOut { seconds: timeout_secs, output: output.clone() })
            }
            None => Ok(ShellOutput { exit_code: Some(0), ..Default::default() }),
        }
    }
}
