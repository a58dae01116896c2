//! External tool catalogue and the per-request execution context.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::runner::{ProcessOutput, ProcessRunner, Runner, RunnerError};

/// External programs the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Renderer, validator and v2→v3 upgrader.
    Xml2rfc,
    /// Kramdown-flavoured markdown converter.
    Kramdown,
    /// Mmark-flavoured markdown converter.
    Mmark,
    /// reStructuredText converter.
    Rst2rfcxml,
    /// Plain-text draft to XML converter.
    Id2xml,
    /// Primary comparison tool.
    Iddiff,
    /// Fallback comparison tool.
    Rfcdiff,
    /// Draft conformance checker.
    Idnits,
    /// SVG profile checker.
    Svgcheck,
    /// ABNF extractor.
    Aex,
    /// ABNF parser.
    Bap,
}

impl Tool {
    /// Every tool, in reporting order.
    pub const ALL: [Self; 11] = [
        Self::Xml2rfc,
        Self::Kramdown,
        Self::Mmark,
        Self::Rst2rfcxml,
        Self::Id2xml,
        Self::Iddiff,
        Self::Rfcdiff,
        Self::Idnits,
        Self::Svgcheck,
        Self::Aex,
        Self::Bap,
    ];

    /// Configuration key naming this tool.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Xml2rfc => "xml2rfc",
            Self::Kramdown => "kramdown",
            Self::Mmark => "mmark",
            Self::Rst2rfcxml => "rst2rfcxml",
            Self::Id2xml => "id2xml",
            Self::Iddiff => "iddiff",
            Self::Rfcdiff => "rfcdiff",
            Self::Idnits => "idnits",
            Self::Svgcheck => "svgcheck",
            Self::Aex => "aex",
            Self::Bap => "bap",
        }
    }

    /// Executable name used when no override is configured.
    #[must_use]
    pub fn default_program(self) -> &'static str {
        match self {
            Self::Kramdown => "kramdown-rfc",
            other => other.key(),
        }
    }

    /// Look up a tool by its configuration key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.key() == key)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_program())
    }
}

/// Execution context threaded through every pipeline stage.
///
/// Bundles the [`Runner`], program overrides and time budgets so stages
/// never reach for process-wide state.
#[derive(Clone)]
pub struct Toolchain {
    runner: Arc<dyn Runner>,
    programs: HashMap<Tool, String>,
    timeout: Duration,
    diff_timeout: Duration,
}

impl fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toolchain")
            .field("programs", &self.programs)
            .field("timeout", &self.timeout)
            .field("diff_timeout", &self.diff_timeout)
            .finish_non_exhaustive()
    }
}

impl Toolchain {
    /// Budget for converters, renderers and checkers.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
    /// Budget for each comparison tool attempt.
    pub const DEFAULT_DIFF_TIMEOUT: Duration = Duration::from_secs(20);

    /// Create a toolchain running programs through `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn Runner>) -> Self {
        Self {
            runner,
            programs: HashMap::new(),
            timeout: Self::DEFAULT_TIMEOUT,
            diff_timeout: Self::DEFAULT_DIFF_TIMEOUT,
        }
    }

    /// Create a toolchain spawning real processes.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(ProcessRunner))
    }

    /// Use `program` instead of the tool's default executable.
    #[must_use]
    pub fn with_program(mut self, tool: Tool, program: impl Into<String>) -> Self {
        self.programs.insert(tool, program.into());
        self
    }

    /// Set the default time budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the comparison tool time budget.
    #[must_use]
    pub fn with_diff_timeout(mut self, timeout: Duration) -> Self {
        self.diff_timeout = timeout;
        self
    }

    /// Executable invoked for `tool`.
    #[must_use]
    pub fn program(&self, tool: Tool) -> &str {
        self.programs
            .get(&tool)
            .map_or_else(|| tool.default_program(), String::as_str)
    }

    /// Default time budget.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Comparison tool time budget.
    #[must_use]
    pub fn diff_timeout(&self) -> Duration {
        self.diff_timeout
    }

    /// Run `tool` with the default time budget.
    pub fn run(&self, tool: Tool, args: &[String]) -> Result<ProcessOutput, RunnerError> {
        self.run_with_timeout(tool, args, self.timeout)
    }

    /// Run `tool` with an explicit time budget.
    pub fn run_with_timeout(
        &self,
        tool: Tool,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, RunnerError> {
        self.runner.run(self.program(tool), args, timeout)
    }
}

/// Render a path as a command-line argument.
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
