//! Execution Engine - Runs Untrusted Code as a Subprocess
//!
//! **Core Responsibility:**
//! Execute one code string with one stdin payload and capture raw outputs.
//!
//! **Architectural Boundary:**
//! - Engine knows HOW to execute (interpreter, pipes, timeout)
//! - Engine does NOT compare outputs or assign verdicts
//! - Engine returns raw outputs for the Evaluator to judge
//!
//! **Isolation:**
//! The OS process boundary plus a wall-clock timeout, nothing more. There is no
//! memory quota and no filesystem or network restriction beyond a throwaway
//! working directory.
//!
//! **Process Group:**
//! On unix the interpreter leads its own process group. Once it exits, or the
//! timeout fires, the whole group is killed so background children cannot
//! outlive the call or hold the output pipes open.
//!
//! **Output Capture:**
//! Each stream keeps at most `max_output_bytes`; the rest is drained and
//! dropped so the program never blocks on a full pipe.

use async_trait::async_trait;
use grader_common::config::{
    GraderConfig, InterpreterConfig, MAX_OUTPUT_BYTES, MAX_SOURCE_CODE_BYTES, MAX_TEST_INPUT_BYTES,
};
use grader_common::types::ExecutionResult;
use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tracing::{debug, warn};

use crate::error::ExecutionError;

/// Swappable execution backend.
///
/// One call is one execution attempt; implementations never retry.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn run(
        &self,
        code: &str,
        stdin: &str,
        timeout: Duration,
    ) -> Result<ExecutionResult, ExecutionError>;
}

/// Runs code by writing it to a temporary script and invoking an interpreter on it
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    interpreter: InterpreterConfig,
    max_source_bytes: usize,
    max_input_bytes: usize,
    max_output_bytes: usize,
}

impl ProcessEngine {
    pub fn new(interpreter: InterpreterConfig) -> Self {
        Self {
            interpreter,
            max_source_bytes: MAX_SOURCE_CODE_BYTES,
            max_input_bytes: MAX_TEST_INPUT_BYTES,
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }

    pub fn from_config(config: &GraderConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            max_source_bytes: config.max_source_bytes,
            max_input_bytes: config.max_input_bytes,
            max_output_bytes: config.max_output_bytes,
        }
    }

    pub fn with_limits(mut self, max_source_bytes: usize, max_input_bytes: usize) -> Self {
        self.max_source_bytes = max_source_bytes;
        self.max_input_bytes = max_input_bytes;
        self
    }

    pub fn with_output_limit(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    pub fn interpreter(&self) -> &InterpreterConfig {
        &self.interpreter
    }
}

#[async_trait]
impl ExecutionEngine for ProcessEngine {
    /// Execute code with hard timeout semantics
    ///
    /// - Rejects oversized source or stdin before spawning
    /// - On timeout the process group is killed and the child reaped before returning
    /// - Partial output of a timed-out run is discarded
    /// - Captured output is capped per stream
    /// - A non-zero exit status is a normal result, not an error
    #[tracing::instrument(
        skip(self, code, stdin),
        fields(
            interpreter = %self.interpreter.command,
            source_bytes = code.len(),
            timeout_ms = timeout.as_millis() as u64
        )
    )]
    async fn run(
        &self,
        code: &str,
        stdin: &str,
        timeout: Duration,
    ) -> Result<ExecutionResult, ExecutionError> {
        if code.len() > self.max_source_bytes {
            return Err(ExecutionError::SourceTooLarge {
                limit: self.max_source_bytes,
            });
        }
        if stdin.len() > self.max_input_bytes {
            return Err(ExecutionError::InputTooLarge {
                limit: self.max_input_bytes,
            });
        }

        // Removed when dropped at the end of this call
        let workspace = tempfile::Builder::new()
            .prefix("grader-")
            .tempdir()
            .map_err(ExecutionError::Workspace)?;
        let script = workspace
            .path()
            .join(format!("main.{}", self.interpreter.file_extension));
        tokio::fs::write(&script, code)
            .await
            .map_err(ExecutionError::Workspace)?;

        let mut command = Command::new(&self.interpreter.command);
        command
            .args(&self.interpreter.args)
            .arg(&script)
            .current_dir(workspace.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|source| ExecutionError::Spawn {
                command: self.interpreter.command.clone(),
                source,
            })?;

        let start_time = Instant::now();
        // Leader pid doubles as the group id
        let process_group = child.id();

        let stdin_pipe = child.stdin.take();
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let execution = async {
            let (status, stdout, stderr, ()) = tokio::join!(
                async {
                    let status = child.wait().await;
                    // Leftover background children would keep the pipes open
                    kill_process_group(process_group);
                    status
                },
                read_pipe(stdout_pipe, self.max_output_bytes),
                read_pipe(stderr_pipe, self.max_output_bytes),
                feed_stdin(stdin_pipe, stdin.as_bytes()),
            );
            Ok::<_, io::Error>((status?, stdout?, stderr?))
        };

        let outcome = tokio::time::timeout(timeout, execution).await;
        let duration_ms = start_time.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok((status, (stdout, stdout_truncated), (stderr, stderr_truncated)))) => {
                debug!(
                    exit_status = ?status.code(),
                    duration_ms,
                    stdout_bytes = stdout.len(),
                    stderr_bytes = stderr.len(),
                    stdout_truncated,
                    stderr_truncated,
                    "Process finished"
                );
                if stdout_truncated || stderr_truncated {
                    warn!(limit = self.max_output_bytes, "Output exceeded capture limit - truncated");
                }
                Ok(ExecutionResult {
                    stdout,
                    stderr,
                    exit_status: status.code(),
                    timed_out: false,
                    duration_ms,
                    stdout_truncated,
                    stderr_truncated,
                })
            }
            Ok(Err(e)) => {
                // Pipes failed mid-run; make sure nothing outlives the call
                kill_process_group(process_group);
                if let Err(kill_err) = child.kill().await {
                    warn!(error = %kill_err, "Failed to kill child after i/o error");
                }
                Err(ExecutionError::Io(e))
            }
            Err(_) => {
                warn!(duration_ms, "Execution timed out - killing process group");
                kill_process_group(process_group);
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed-out process");
                }
                Ok(ExecutionResult {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_status: None,
                    timed_out: true,
                    duration_ms,
                    stdout_truncated: false,
                    stderr_truncated: false,
                })
            }
        }
    }
}

/// Read up to `limit` bytes, then drain the rest. The flag reports whether
/// anything was dropped.
async fn read_pipe<R>(pipe: Option<R>, limit: usize) -> io::Result<(String, bool)>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut truncated = false;
    if let Some(pipe) = pipe {
        let mut captured = pipe.take(limit as u64);
        captured.read_to_end(&mut buf).await?;
        let mut rest = captured.into_inner();
        let dropped = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await?;
        truncated = dropped > 0;
    }
    Ok((String::from_utf8_lossy(&buf).into_owned(), truncated))
}

/// SIGKILL every process in the group led by `pgid`. An already empty group is fine.
#[cfg(unix)]
fn kill_process_group(pgid: Option<u32>) {
    let Some(pgid) = pgid else {
        return;
    };
    // SAFETY: killpg has no memory-safety preconditions
    let rc = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!(pgid, error = %err, "Failed to kill process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: Option<u32>) {}

/// Write the whole input, then close the pipe so the program sees EOF.
async fn feed_stdin(pipe: Option<ChildStdin>, input: &[u8]) {
    let Some(mut pipe) = pipe else {
        return;
    };
    if let Err(e) = pipe.write_all(input).await {
        // Programs that exit without reading their input close the pipe early
        if e.kind() != io::ErrorKind::BrokenPipe {
            debug!(error = %e, "Failed to write stdin");
        }
    }
}
