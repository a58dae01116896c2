//! Comparison of two canonical text documents.
//!
//! iddiff is tried first; if it cannot run, times out or exits non-zero,
//! rfcdiff gets one attempt with the equivalent mode before the request
//! fails.

use std::fs;

use crate::error::PipelineError;
use crate::logs::strip_dirs;
use crate::scratch::WorkingFile;
use crate::tool::{Tool, Toolchain, path_arg};

/// Output style of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffMode {
    /// Full side-by-side HTML page.
    #[default]
    Plain,
    /// Bare HTML table (iddiff only; rfcdiff falls back to plain).
    Table,
    /// Word diff.
    WordDiff,
    /// Change bars in the margin.
    ChangeBars,
    /// Added and removed blocks.
    AddedRemoved,
}

impl DiffMode {
    /// Pick a mode from mutually exclusive request flags.
    ///
    /// Word diff wins over change bars, which win over added/removed
    /// blocks; `table` only applies when none of them is set.
    #[must_use]
    pub fn from_flags(table: bool, wdiff: bool, chbars: bool, abdiff: bool) -> Self {
        if wdiff {
            Self::WordDiff
        } else if chbars {
            Self::ChangeBars
        } else if abdiff {
            Self::AddedRemoved
        } else if table {
            Self::Table
        } else {
            Self::Plain
        }
    }

    fn flag(self, tool: Tool) -> Option<&'static str> {
        match self {
            Self::Plain => None,
            Self::Table => (tool == Tool::Iddiff).then_some("-t"),
            Self::WordDiff => Some("--hwdiff"),
            Self::ChangeBars => Some("--chbars"),
            Self::AddedRemoved => Some("--abdiff"),
        }
    }
}

/// Two text documents to compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRequest {
    pub old: WorkingFile,
    pub new: WorkingFile,
    pub mode: DiffMode,
}

impl DiffRequest {
    #[must_use]
    pub fn new(old: WorkingFile, new: WorkingFile, mode: DiffMode) -> Self {
        Self { old, new, mode }
    }
}

/// Compare the two documents of `request`.
///
/// Both scratch directories are stripped from the output.
pub fn diff(toolchain: &Toolchain, request: &DiffRequest) -> Result<String, PipelineError> {
    check_input(&request.old)?;
    check_input(&request.new)?;

    let output = match attempt(toolchain, Tool::Iddiff, request) {
        Ok(output) => output,
        Err(primary) => {
            tracing::warn!(error = %primary, "iddiff failed, retrying with rfcdiff");
            attempt(toolchain, Tool::Rfcdiff, request).map_err(|fallback| {
                let message = format!("iddiff error: {primary}\nrfcdiff error: {fallback}");
                tracing::info!(%message, "Diff failed");
                PipelineError::Diff(message)
            })?
        }
    };

    Ok(strip_dirs(
        &output,
        &[request.old.path(), request.new.path()],
    ))
}

fn attempt(toolchain: &Toolchain, tool: Tool, request: &DiffRequest) -> Result<String, String> {
    tracing::debug!(%tool, mode = ?request.mode, "Running diff");

    let mut args = Vec::new();
    if tool == Tool::Rfcdiff {
        args.push("--stdout".to_owned());
    }
    if let Some(flag) = request.mode.flag(tool) {
        args.push(flag.to_owned());
    }
    args.push(path_arg(request.old.path()));
    args.push(path_arg(request.new.path()));

    let output = toolchain
        .run_with_timeout(tool, &args, toolchain.diff_timeout())
        .map_err(|e| e.to_string())?;

    if !output.is_success() {
        let stderr = strip_dirs(
            output.stderr_lossy().trim(),
            &[request.old.path(), request.new.path()],
        );
        return Err(if stderr.is_empty() {
            format!("{tool} exited with status {}", exit_status(output.code))
        } else {
            stderr
        });
    }

    Ok(output.stdout_lossy())
}

fn exit_status(code: Option<i32>) -> String {
    code.map_or_else(|| "signal".to_owned(), |code| code.to_string())
}

/// Reject missing or blank inputs before any tool runs.
fn check_input(file: &WorkingFile) -> Result<(), PipelineError> {
    let content = fs::read(file.path())
        .map_err(|e| PipelineError::Diff(format!("Can not read {}: {e}", file.file_name())))?;
    if content.iter().all(u8::is_ascii_whitespace) {
        return Err(PipelineError::Diff(format!(
            "{} is empty",
            file.file_name()
        )));
    }
    Ok(())
}
