//! Subprocess execution.
//!
//! Runs external programs (php, certbot, systemctl, curl) with:
//! - No shell interpretation (direct exec)
//! - A hard timeout, after which the child is killed
//! - Captured stdout/stderr

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{CommandErrorKind, ProvisionError};

use super::output::sanitize_output;

/// Lines of stderr kept when a non-zero exit is turned into an error.
const ERROR_OUTPUT_LINES: usize = 10;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of a subprocess execution.
#[derive(Debug, Clone)]
pub struct SubprocessResult {
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
    /// The exit code, if available.
    pub exit_code: Option<i32>,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl SubprocessResult {
    /// Turn a non-zero exit into a `NonZeroExit` error.
    ///
    /// Falls back to stdout for the message when stderr is empty (certbot
    /// prints some failures there).
    pub fn check(self, program: &str) -> Result<Self, ProvisionError> {
        if self.success {
            return Ok(self);
        }

        let detail = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };

        Err(ProvisionError::Command {
            kind: CommandErrorKind::NonZeroExit {
                program: program.to_string(),
                code: self.exit_code,
                stderr: sanitize_output(detail, ERROR_OUTPUT_LINES),
            },
        })
    }
}

/// Builder for subprocess execution.
pub struct SubprocessBuilder {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl SubprocessBuilder {
    /// Create a new subprocess builder with a 60 second timeout.
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Add arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args.extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Set the timeout for the command.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the program to completion or until the timeout expires.
    ///
    /// Both pipes are drained on background threads while the child is
    /// polled, so chatty programs cannot stall on a full pipe. On timeout
    /// the child is killed. A program that cannot be spawned (e.g. not
    /// installed) yields `ExecutionFailed`.
    pub fn run(self) -> Result<SubprocessResult, ProvisionError> {
        debug!(
            program = %self.program,
            args = ?self.args,
            timeout_secs = self.timeout.as_secs(),
            "Executing subprocess"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ProvisionError::execution_failed(format!("Failed to spawn {}: {}", self.program, e))
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let start = Instant::now();

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if start.elapsed() > self.timeout => {
                    warn!(
                        program = %self.program,
                        timeout_secs = self.timeout.as_secs(),
                        "Process timed out, killing"
                    );
                    if let Err(e) = child.kill() {
                        warn!(error = %e, "Failed to kill timed-out process");
                    }
                    let _ = child.wait();
                    return Err(ProvisionError::Command {
                        kind: CommandErrorKind::Timeout {
                            timeout_secs: self.timeout.as_secs(),
                        },
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(ProvisionError::execution_failed(format!(
                        "Failed to check status of {}: {}",
                        self.program, e
                    )));
                }
            }
        };

        let result = SubprocessResult {
            success: status.success(),
            exit_code: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        };
        debug!(
            program = %self.program,
            success = result.success,
            exit_code = ?result.exit_code,
            duration_ms = start.elapsed().as_millis(),
            "Subprocess completed"
        );
        Ok(result)
    }
}

/// Read a pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            // A read error leaves whatever arrived before it.
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

/// Run a command with the given arguments and timeout.
pub fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<SubprocessResult, ProvisionError> {
    SubprocessBuilder::new(program)
        .args(args.iter().copied())
        .timeout(timeout)
        .run()
}
