//! Mock runner implementation for testing.
//!
//! Provides [`MockRunner`] for unit testing pipeline stages without the
//! external tools installed.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::runner::{ProcessOutput, Runner, RunnerError};
use crate::tool::Toolchain;

/// Scripted behaviour for one program.
type Handler = Box<dyn Fn(&[String]) -> Result<ProcessOutput, RunnerError> + Send + Sync>;

/// A recorded call to [`MockRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program as passed to the runner.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Time budget the caller asked for.
    pub timeout: Duration,
}

/// Mock runner for testing.
///
/// Records every invocation and answers from scripted handlers keyed by
/// program name. Programs without a handler behave like a missing
/// executable.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use at_pipeline::{MockRunner, ProcessOutput, Tool};
///
/// let runner = Arc::new(
///     MockRunner::new().with_output("idnits", ProcessOutput::exited(0, "ok", "")),
/// );
/// let toolchain = MockRunner::toolchain(&runner);
/// toolchain.run(Tool::Idnits, &[]).unwrap();
/// assert!(runner.invoked("idnits"));
/// ```
#[derive(Default)]
pub struct MockRunner {
    handlers: RwLock<HashMap<String, Handler>>,
    calls: RwLock<Vec<Invocation>>,
}

impl fmt::Debug for MockRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockRunner")
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

impl MockRunner {
    /// Create a mock that knows no programs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a [`Toolchain`] that runs everything through `runner`.
    #[must_use]
    pub fn toolchain(runner: &Arc<Self>) -> Toolchain {
        Toolchain::new(Arc::clone(runner) as Arc<dyn Runner>)
    }

    /// Script `program` with a handler receiving the call arguments.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_handler<F>(self, program: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&[String]) -> Result<ProcessOutput, RunnerError> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .unwrap()
            .insert(program.into(), Box::new(handler));
        self
    }

    /// Script `program` to always return `output`.
    #[must_use]
    pub fn with_output(self, program: impl Into<String>, output: ProcessOutput) -> Self {
        self.with_handler(program, move |_| Ok(output.clone()))
    }

    /// Script `program` to always time out.
    #[must_use]
    pub fn with_timeout(self, program: impl Into<String>) -> Self {
        let program = program.into();
        let name = program.clone();
        self.with_handler(program, move |_| {
            Err(RunnerError::Timeout {
                program: name.clone(),
                timeout: Duration::from_secs(1),
            })
        })
    }

    /// All invocations so far, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.read().unwrap().clone()
    }

    /// Arguments of every call to `program`.
    #[must_use]
    pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|call| call.program == program)
            .map(|call| call.args)
            .collect()
    }

    /// Whether `program` was invoked at least once.
    #[must_use]
    pub fn invoked(&self, program: &str) -> bool {
        self.calls().iter().any(|call| call.program == program)
    }
}

impl Runner for MockRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, RunnerError> {
        self.calls.write().unwrap().push(Invocation {
            program: program.to_owned(),
            args: args.to_vec(),
            timeout,
        });

        let handlers = self.handlers.read().unwrap();
        match handlers.get(program) {
            Some(handler) => handler(args),
            None => Err(RunnerError::Spawn {
                program: program.to_owned(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

/// Path following `--out` in a tool's arguments.
#[must_use]
pub fn output_arg(args: &[String]) -> Option<&Path> {
    args.iter()
        .position(|arg| arg == "--out")
        .and_then(|i| args.get(i + 1))
        .map(Path::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_records_calls() {
        let runner = MockRunner::new().with_output("aex", ProcessOutput::exited(0, "", ""));

        runner
            .run("aex", &["a.txt".to_owned()], Duration::from_secs(3))
            .unwrap();

        assert_eq!(
            runner.calls(),
            vec![Invocation {
                program: "aex".to_owned(),
                args: vec!["a.txt".to_owned()],
                timeout: Duration::from_secs(3),
            }]
        );
    }

    #[test]
    fn test_unknown_program_not_found() {
        let runner = MockRunner::new();
        let err = runner.run("bap", &[], Duration::from_secs(1)).unwrap_err();

        assert!(matches!(err, RunnerError::Spawn { .. }));
        assert!(runner.invoked("bap"));
    }

    #[test]
    fn test_output_arg() {
        let args = vec![
            "--text".to_owned(),
            "--out".to_owned(),
            "/s/d.txt".to_owned(),
            "/s/d.xml".to_owned(),
        ];
        assert_eq!(output_arg(&args), Some(Path::new("/s/d.txt")));
        assert_eq!(output_arg(&args[..2]), None);
    }
}
