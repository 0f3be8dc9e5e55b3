//! Bounded external process execution.
//!
//! Every external tool the converter drives runs through [`run_bounded`],
//! which never panics and never blocks past its deadline: a missing
//! executable, a crash, a nonzero exit and a timeout all come back as a
//! [`ProcessOutcome`] variant.

use std::env;
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const STDERR_LIMIT: usize = 2048;

/// How a bounded process run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Exited with status 0.
    Success,
    /// Still running at the deadline; the process was killed.
    Timeout,
    /// Exited with a nonzero status. `code` is `None` when killed by a signal.
    NonZeroExit {
        /// The exit code, if any.
        code: Option<i32>,
        /// Captured standard error, truncated.
        stderr: String,
    },
    /// The executable does not exist.
    NotFound,
    /// The process could not be started or waited on.
    SpawnFailed {
        /// The OS error message.
        message: String,
    },
}

impl ProcessOutcome {
    /// Returns true for [`ProcessOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessOutcome::Success)
    }
}

impl fmt::Display for ProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessOutcome::Success => f.write_str("exited successfully"),
            ProcessOutcome::Timeout => f.write_str("timed out"),
            ProcessOutcome::NonZeroExit { code: Some(code), stderr } if !stderr.is_empty() => {
                write!(f, "exited with status {code}: {stderr}")
            }
            ProcessOutcome::NonZeroExit { code: Some(code), .. } => {
                write!(f, "exited with status {code}")
            }
            ProcessOutcome::NonZeroExit { code: None, .. } => f.write_str("terminated by signal"),
            ProcessOutcome::NotFound => f.write_str("executable not found"),
            ProcessOutcome::SpawnFailed { message } => write!(f, "failed to start: {message}"),
        }
    }
}

/// Runs `command` to completion or until `timeout` elapses.
///
/// Standard input and output are discarded; standard error is captured for
/// diagnostics. On timeout the child is killed and reaped.
///
/// # Examples
///
/// ```no_run
/// use std::process::Command;
/// use std::time::Duration;
/// use payslip_engine::convert::{ProcessOutcome, run_bounded};
///
/// let mut command = Command::new("fc-cache");
/// command.arg("-f");
/// let outcome = run_bounded(command, Duration::from_secs(10));
/// assert!(matches!(outcome, ProcessOutcome::Success | ProcessOutcome::NotFound));
/// ```
pub fn run_bounded(mut command: Command, timeout: Duration) -> ProcessOutcome {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return ProcessOutcome::NotFound,
        Err(e) => {
            return ProcessOutcome::SpawnFailed {
                message: e.to_string(),
            };
        }
    };

    // Drained on a separate thread so a chatty child cannot fill the pipe and stall.
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                debug!(program = %program, timeout_ms = timeout.as_millis() as u64, "process killed at deadline");
                return ProcessOutcome::Timeout;
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                return ProcessOutcome::SpawnFailed {
                    message: e.to_string(),
                };
            }
        }
    };

    if status.success() {
        return ProcessOutcome::Success;
    }
    let stderr = stderr_reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| truncate(String::from_utf8_lossy(&bytes).trim()))
        .unwrap_or_default();
    ProcessOutcome::NonZeroExit {
        code: status.code(),
        stderr,
    }
}

fn truncate(text: &str) -> String {
    if text.len() <= STDERR_LIMIT {
        return text.to_string();
    }
    let mut end = STDERR_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Looks up an executable by name on `PATH`.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path).find_map(|dir| executable_in(&dir, name))
}

fn executable_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let candidate = dir.join(name);
    if candidate.is_file() {
        return Some(candidate);
    }
    if cfg!(windows) {
        let with_extension = dir.join(format!("{name}.exe"));
        if with_extension.is_file() {
            return Some(with_extension);
        }
    }
    None
}
