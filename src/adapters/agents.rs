//! Installed-agent detection and agent hand-off.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::thread;

use tracing::{debug, info};

use super::shell::resolve_shell;
use crate::domain::{AppError, MergedConfig};

/// Agent CLIs probed even when no configuration mentions them.
pub const KNOWN_AGENT_BINS: &[&str] = &["claude", "gemini", "codex", "aider", "goose"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedAgent {
    pub name: String,
    pub bin: String,
    pub path: PathBuf,
}

/// `(name, program)` pairs: configured agents first, then known binaries not
/// already covered.
pub fn detection_candidates(config: &MergedConfig) -> Vec<(String, String)> {
    let mut candidates: Vec<(String, String)> = config
        .agents
        .iter()
        .filter_map(|(name, agent)| {
            let program = shell_words::split(&agent.bin).ok()?.into_iter().next()?;
            Some((name.clone(), program))
        })
        .collect();

    for bin in KNOWN_AGENT_BINS {
        let covered = candidates.iter().any(|(name, program)| name == bin || program == bin);
        if !covered {
            candidates.push((bin.to_string(), bin.to_string()));
        }
    }
    candidates
}

/// Probe every candidate on `PATH`, one thread each.
pub fn detect_agents(config: &MergedConfig) -> Vec<DetectedAgent> {
    detect_agents_in(&detection_candidates(config), std::env::var_os("PATH"))
}

pub fn detect_agents_in(
    candidates: &[(String, String)],
    search_path: Option<OsString>,
) -> Vec<DetectedAgent> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    let found = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for (name, bin) in candidates {
            let (found, search_path, cwd) = (&found, &search_path, &cwd);
            scope.spawn(move || {
                if let Ok(path) = which::which_in(bin, search_path.as_ref(), cwd) {
                    debug!(agent = %name, path = %path.display(), "agent binary found");
                    let detected = DetectedAgent { name: name.clone(), bin: bin.clone(), path };
                    found.lock().unwrap_or_else(|e| e.into_inner()).push(detected);
                }
            });
        }
    });

    let mut found = found.into_inner().unwrap_or_else(|e| e.into_inner());
    found.sort_by(|a, b| a.name.cmp(&b.name));
    found
}

/// Run `command_line` through the shell with inherited stdio.
///
/// On Unix the current process is replaced and this only returns on failure.
/// Elsewhere the agent runs as a child and its exit code is returned.
pub fn launch_agent(
    agent: &str,
    command_line: &str,
    shell: Option<&str>,
    working_dir: &Path,
) -> Result<i32, AppError> {
    let launch_error =
        |details: String| AppError::AgentLaunch { agent: agent.to_string(), details };

    let mut argv = resolve_shell(shell, None).map_err(|e| launch_error(e.to_string()))?;
    argv.push(command_line.to_string());

    let mut command = Command::new(&argv[0]);
    command.args(&argv[1..]).current_dir(working_dir);
    info!(agent, "launching agent");

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let err = command.exec();
        Err(launch_error(err.to_string()))
    }

    #[cfg(not(unix))]
    {
        let status = command.status().map_err(|e| launch_error(e.to_string()))?;
        Ok(status.code().unwrap_or(1))
    }
}
