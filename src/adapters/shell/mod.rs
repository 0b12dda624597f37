//! Shell runner backed by `std::process`.

mod detect;

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::ports::{ShellError, ShellOutput, ShellRunner};

pub use detect::resolve_shell;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Time readers get to flush after the process group is killed.
const KILL_GRACE: Duration = Duration::from_millis(200);

/// Runs commands through a shell in their own process group.
#[derive(Debug, Clone, Default)]
pub struct ProcessShellRunner {
    default_shell: Option<String>,
}

impl ProcessShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shell used when a call passes none.
    pub fn with_default_shell(default_shell: Option<String>) -> Self {
        Self { default_shell }
    }
}

impl ShellRunner for ProcessShellRunner {
    fn run(
        &self,
        command: &str,
        working_dir: Option<&Path>,
        shell: Option<&str>,
        timeout_secs: u64,
    ) -> Result<ShellOutput, ShellError> {
        let mut argv = resolve_shell(shell, self.default_shell.as_deref())?;
        argv.push(command.to_string());
        let program = argv[0].clone();

        let mut cmd = Command::new(&program);
        cmd.args(&argv[1..]).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        debug!(program = %program, timeout_secs, "spawning shell command");
        let mut child = cmd.spawn().map_err(|source| ShellError::Spawn { program, source })?;
        let stdout = PipeReader::spawn(child.stdout.take());
        let stderr = PipeReader::spawn(child.stderr.take());
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);

        let status = match wait_until(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => return Err(timed_out(&mut child, timeout_secs, &stdout, &stderr)),
            Err(err) => {
                kill_process_group(&mut child);
                return Err(ShellError::Wait(err));
            }
        };

        // Descendants may still hold the pipes open after the shell exits.
        if !stdout.wait_done(deadline) || !stderr.wait_done(deadline) {
            return Err(timed_out(&mut child, timeout_secs, &stdout, &stderr));
        }

        Ok(ShellOutput {
            stdout: stdout.snapshot(),
            stderr: stderr.snapshot(),
            exit_code: status.code(),
            timed_out: false,
        })
    }
}

fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn timed_out(
    child: &mut Child,
    seconds: u64,
    stdout: &PipeReader,
    stderr: &PipeReader,
) -> ShellError {
    warn!(seconds, "command timed out; killing its process group");
    kill_process_group(child);
    let grace = Instant::now() + KILL_GRACE;
    stdout.wait_done(grace);
    stderr.wait_done(grace);
    let output = ShellOutput {
        stdout: stdout.snapshot(),
        stderr: stderr.snapshot(),
        exit_code: None,
        timed_out: true,
    };
    ShellError::TimedOut { seconds, output }
}

/// Kill the child and everything it started, then reap the child.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    // The child leads its own group, so the negative pid addresses all of it.
    unsafe {
        libc::kill(-(child.id() as i32), libc::SIGKILL);
    }
    let _ = child.wait();
}

/// Without process groups only the direct child can be killed; grandchildren
/// it spawned keep running.
#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Drains one pipe on a background thread.
struct PipeReader {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
    finished: Mutex<bool>,
}

impl PipeReader {
    fn spawn<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let sink = Arc::clone(&buffer);
        thread::spawn(move || {
            if let Some(mut pipe) = pipe {
                let mut chunk = [0u8; 8192];
                loop {
                    match pipe.read(&mut chunk) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => sink.lock().unwrap_or_else(|e| e.into_inner()).extend(&chunk[..n]),
                    }
                }
            }
            let _ = tx.send(());
        });
        Self { buffer, done, finished: Mutex::new(false) }
    }

    /// Whether the pipe reached EOF before `deadline`.
    fn wait_done(&self, deadline: Instant) -> bool {
        let mut finished = self.finished.lock().unwrap_or_else(|e| e.into_inner());
        if !*finished {
            let remaining = deadline.saturating_duration_since(Instant::now());
            *finished = self.done.recv_timeout(remaining).is_ok();
        }
        *finished
    }

    fn snapshot(&self) -> String {
        let bytes = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
