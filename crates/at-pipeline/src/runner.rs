//! External process execution with a wall-clock budget.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Raw standard output.
    pub stdout: Vec<u8>,
    /// Raw standard error.
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Output of a process that exited with `code`.
    #[must_use]
    pub fn exited(code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Standard output decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Standard error decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Failure to obtain any output from a process.
///
/// A process that runs and exits non-zero is not a runner error; callers
/// inspect [`ProcessOutput::code`] for that.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The executable could not be started (not found, permission denied).
    #[error("Error running {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The process did not finish in time and was killed.
    #[error("{program} did not finish within {} seconds", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
    /// Waiting on the child failed.
    #[error("Error waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    /// Program that failed to run.
    #[must_use]
    pub fn program(&self) -> &str {
        match self {
            Self::Spawn { program, .. }
            | Self::Timeout { program, .. }
            | Self::Wait { program, .. } => program,
        }
    }
}

/// Executes external commands.
///
/// Implementations must not leave a child running past `timeout`.
pub trait Runner: Send + Sync {
    /// Run `program` with `args`, capturing both output streams.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] if the program cannot be started and
    /// [`RunnerError::Timeout`] if it exceeds `timeout`.
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, RunnerError>;
}

/// [`Runner`] backed by real OS processes.
///
/// On unix the child leads its own process group, and the whole group is
/// killed at the deadline, so helpers a tool spawns cannot outlive it or
/// hold its pipes open past `timeout`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, RunnerError> {
        tracing::debug!(program, ?args, timeout_secs = timeout.as_secs(), "Running");

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
            program: program.to_owned(),
            source,
        })?;

        // Pipes are drained concurrently so a chatty child cannot block on a full buffer
        let (tx, rx) = mpsc::channel();
        drain(Stream::Stdout, child.stdout.take(), tx.clone());
        drain(Stream::Stderr, child.stderr.take(), tx);

        let deadline = Instant::now() + timeout;
        let timed_out = |child: &mut Child| {
            kill_group(child);
            tracing::warn!(program, timeout_secs = timeout.as_secs(), "Killed after timeout");
            RunnerError::Timeout {
                program: program.to_owned(),
                timeout,
            }
        };

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => return Err(timed_out(&mut child)),
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    kill_group(&mut child);
                    return Err(RunnerError::Wait {
                        program: program.to_owned(),
                        source,
                    });
                }
            }
        };

        // A leftover grandchild can keep the pipes open after the child exits
        let mut output = ProcessOutput {
            code: status.code(),
            ..ProcessOutput::default()
        };
        for _ in 0..2 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok((Stream::Stdout, buf)) => output.stdout = buf,
                Ok((Stream::Stderr, buf)) => output.stderr = buf,
                Err(RecvTimeoutError::Timeout) => return Err(timed_out(&mut child)),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        tracing::debug!(program, code = ?output.code, "Finished");
        Ok(output)
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn drain<R: Read + Send + 'static>(
    stream: Stream,
    pipe: Option<R>,
    tx: mpsc::Sender<(Stream, Vec<u8>)>,
) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send((stream, buf));
    });
}

/// Kill the child and everything in its process group, then reap it.
fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: killpg only sends a signal; the group was created by process_group(0)
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}
