use std::ffi::OsString;
use std::path::PathBuf;

use crate::ports::ShellError;

/// Shells tried, in order, when nothing is configured.
pub const PREFERRED_SHELLS: &[&str] = &["bash", "zsh", "sh"];

/// Turn a shell spec (`"bash"`, `"zsh -lc"`) into argv, ready for the command
/// string to be appended. A bare program gets `-c`.
pub fn shell_argv(spec: &str) -> Result<Vec<String>, ShellError> {
    let mut argv = shell_words::split(spec).map_err(|err| ShellError::InvalidShell {
        spec: spec.to_string(),
        details: err.to_string(),
    })?;
    match argv.len() {
        0 => Err(ShellError::InvalidShell {
            spec: spec.to_string(),
            details: "shell is empty".to_string(),
        }),
        1 => {
            argv.push("-c".to_string());
            Ok(argv)
        }
        _ => Ok(argv),
    }
}

/// argv for `explicit`, else `default`, else the first preferred shell found.
pub fn resolve_shell(
    explicit: Option<&str>,
    default: Option<&str>,
) -> Result<Vec<String>, ShellError> {
    match explicit.or(default) {
        Some(spec) => shell_argv(spec),
        None => Ok(vec![detect_shell()?.display().to_string(), "-c".to_string()]),
    }
}

/// First preferred shell on `PATH`.
pub fn detect_shell() -> Result<PathBuf, ShellError> {
    detect_shell_in(std::env::var_os("PATH"))
}

/// First preferred shell on the given search path.
pub fn detect_shell_in(search_path: Option<OsString>) -> Result<PathBuf, ShellError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    PREFERRED_SHELLS
        .iter()
        .find_map(|shell| which::which_in(shell, search_path.as_ref(), &cwd).ok())
        .ok_or_else(|| ShellError::NoShell {
            tried: PREFERRED_SHELLS.iter().map(|s| s.to_string()).collect(),
        })
}
