//! Shell command execution with a hard timeout.

use crate::error::BuildFailure;
use crate::utils::truncate_tail;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// How long pipe readers may keep going once the process has exited or been killed.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

pub struct CommandRunResult {
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandRunResult {
    /// stdout followed by stderr.
    pub fn combined_output(&self) -> String {
        match (self.stdout.trim_end().is_empty(), self.stderr.trim_end().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, _) => self.stderr.trim_end().to_string(),
        }
    }
}

/// Run `command`, killing it (and on unix its whole process group) once
/// `timeout` has elapsed.
///
/// Both pipes are drained on their own threads so a chatty process cannot
/// block on a full pipe while we wait for it. Readers get a short grace
/// period after exit; a grandchild still holding a pipe open is not waited for.
pub fn run_command_with_timeout(command: &mut Command, timeout: Duration) -> Result<CommandRunResult, String> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to start command: {}", e))?;

    let stdout = child.stdout.take().ok_or_else(|| "Failed to capture stdout".to_string())?;
    let stderr = child.stderr.take().ok_or_else(|| "Failed to capture stderr".to_string())?;
    let stdout_rx = spawn_reader(stdout);
    let stderr_rx = spawn_reader(stderr);

    let start = Instant::now();
    let mut timed_out = false;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    timed_out = true;
                    kill_process_tree(&mut child);
                    match child.wait() {
                        Ok(status) => break Some(status),
                        Err(_) => break None,
                    }
                }
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                kill_process_tree(&mut child);
                return Err(format!("Failed to wait for command: {}", e));
            }
        }
    };

    let deadline = Instant::now() + PIPE_DRAIN_GRACE;
    let stdout_bytes = drain_until(&stdout_rx, deadline);
    let stderr_bytes = drain_until(&stderr_rx, deadline);

    Ok(CommandRunResult {
        status,
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        timed_out,
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// Collect chunks until the reader closes or `deadline` passes.
fn drain_until(rx: &Receiver<Vec<u8>>, deadline: Instant) -> Vec<u8> {
    let mut buf = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(chunk) => buf.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("Output pipe still open after the command ended; keeping partial output");
                break;
            }
        }
    }
    buf
}

#[cfg(unix)]
fn kill_process_tree(child: &mut Child) {
    // `shell_command` puts the shell in its own group, so its pid is the group id.
    let pgid = child.id() as libc::pid_t;
    let result = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if result == -1 {
        tracing::debug!("killpg({}) failed: {}", pgid, std::io::Error::last_os_error());
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) {
    let _ = child.kill();
}

/// A command line run through the platform shell in `cwd`.
pub fn shell_command(command_line: &str, cwd: &Path) -> Command {
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.args(["/C", command_line]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command_line]);
        c
    };
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.current_dir(cwd);
    command
}

/// Run a verification command and classify the result.
///
/// Captured output is cut to the last `output_limit` characters.
pub fn run_verification(
    root: &Path,
    command_line: &str,
    timeout: Duration,
    output_limit: usize,
) -> Result<(), BuildFailure> {
    tracing::info!("Running verification: {}", command_line);
    let result = run_command_with_timeout(&mut shell_command(command_line, root), timeout)
        .map_err(BuildFailure::Spawn)?;
    let output = truncate_tail(&result.combined_output(), output_limit);

    if result.timed_out {
        return Err(BuildFailure::Timeout { millis: timeout.as_millis() as u64, output });
    }
    match result.status {
        Some(status) if status.success() => Ok(()),
        Some(status) => Err(BuildFailure::CommandFailed { code: status.code(), output }),
        None => Err(BuildFailure::CommandFailed { code: None, output }),
    }
}
