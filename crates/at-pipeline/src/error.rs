//! Pipeline error type.

use std::path::Path;

use crate::logs::{DiagnosticLog, strip_dir};
use crate::runner::{ProcessOutput, RunnerError};
use crate::scratch::ScratchError;
use crate::tool::Tool;

/// Error from any pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// An external tool ran and reported failure.
    #[error("{message}")]
    Tool { tool: Tool, message: String },
    /// An external tool could not run or ran out of time.
    #[error(transparent)]
    Runner(#[from] RunnerError),
    /// Input is not well-formed XML.
    #[error("XML syntax error: {0}")]
    XmlSyntax(String),
    /// Legacy XML could not be upgraded to the current schema.
    #[error("{0}")]
    XmlNormalization(String),
    /// Canonical text extraction failed at some stage.
    #[error("{0}")]
    TextProcessing(String),
    /// Both comparison tools failed, or inputs were unusable.
    #[error("{0}")]
    Diff(String),
    /// No converter handles this extension.
    #[error("Input file format not supported: {0}")]
    UnsupportedFormat(String),
    /// Scratch storage error.
    #[error(transparent)]
    Scratch(#[from] ScratchError),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Tool responsible for the failure, when one is known.
    #[must_use]
    pub fn tool(&self) -> Option<Tool> {
        match self {
            Self::Tool { tool, .. } => Some(*tool),
            Self::XmlNormalization(_) => Some(Tool::Xml2rfc),
            _ => None,
        }
    }

    /// Failure carrying the tool's stderr verbatim, minus scratch paths.
    pub(crate) fn from_stderr(tool: Tool, output: &ProcessOutput, source: &Path) -> Self {
        let stderr = strip_dir(&output.stderr_lossy(), source);
        let message = if stderr.trim().is_empty() {
            format!("{tool} error")
        } else {
            stderr
        };
        tracing::info!(%tool, %message, "Tool failed");
        Self::Tool { tool, message }
    }

    /// Failure carrying the error lines scraped from a renderer run.
    pub(crate) fn from_scraped(
        tool: Tool,
        output: &ProcessOutput,
        source: &Path,
        fallback: &str,
    ) -> Self {
        let message = DiagnosticLog::from_output(output, source)
            .error_summary()
            .unwrap_or_else(|| fallback.to_owned());
        tracing::info!(%tool, %message, "Tool failed");
        Self::Tool { tool, message }
    }
}
