use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::template::TemplateError;
use crate::ports::ShellError;

/// Why an entry could not be resolved into text.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// None of `file`, `command`, `prompt` is set.
    #[error("defines none of file, command, or prompt")]
    NoSource,

    /// The referenced file is missing or unreadable.
    #[error("cannot read file {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The command could not run or did not finish in time.
    #[error("command `{command}` failed: {source}")]
    Command {
        command: String,
        #[source]
        source: ShellError,
    },

    /// The command ran but exited unsuccessfully.
    #[error("command `{command}` exited with status {code}{}", stderr_suffix(.stderr))]
    CommandExit { command: String, code: i32, stderr: String },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl ResolveError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ResolveError::Command { source: ShellError::TimedOut { .. }, .. })
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() { String::new() } else { format!(": {}", trimmed) }
}
