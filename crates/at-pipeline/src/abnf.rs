//! ABNF extraction and parsing with the BAP tools.
//!
//! Both tools are advisory: a tool that cannot run is logged and yields
//! empty output instead of failing the request.

use serde::Serialize;

use crate::logs::strip_dir;
use crate::runner::ProcessOutput;
use crate::scratch::WorkingFile;
use crate::tool::{Tool, Toolchain, path_arg};

/// Placeholder when aex printed nothing at all.
pub const NO_AEX_OUTPUT: &str = "No output from BAP aex.";

/// Result of parsing ABNF with bap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AbnfParse {
    /// Parser complaints, without the input's path.
    pub errors: String,
    /// Normalized ABNF.
    pub abnf: String,
}

/// Extract the ABNF rules embedded in a text draft.
///
/// aex's stderr (its complaints) comes first, then the extracted rules.
#[must_use]
pub fn extract_abnf(toolchain: &Toolchain, text: &WorkingFile) -> String {
    tracing::debug!("Running bap aex");
    let Some(output) = run_advisory(toolchain, Tool::Aex, text) else {
        return NO_AEX_OUTPUT.to_owned();
    };

    let mut result = String::new();
    if !output.stderr.is_empty() {
        let error = output.stderr_lossy();
        tracing::info!(%error, "bap aex error");
        result.push_str(&strip_dir(&error, text.path()));
    }
    result.push_str(&output.stdout_lossy());

    if result.is_empty() {
        NO_AEX_OUTPUT.to_owned()
    } else {
        result
    }
}

/// Parse an ABNF file with bap.
#[must_use]
pub fn parse_abnf(toolchain: &Toolchain, file: &WorkingFile) -> AbnfParse {
    tracing::debug!("Running bap");
    let Some(output) = run_advisory(toolchain, Tool::Bap, file) else {
        return AbnfParse::default();
    };

    let errors = output
        .stderr_lossy()
        .replace(&path_arg(file.path()), "");
    AbnfParse {
        errors: strip_dir(&errors, file.path()),
        abnf: output.stdout_lossy(),
    }
}

fn run_advisory(toolchain: &Toolchain, tool: Tool, file: &WorkingFile) -> Option<ProcessOutput> {
    toolchain
        .run(tool, &[path_arg(file.path())])
        .inspect_err(|e| tracing::info!(%tool, error = %e, "Process error"))
        .ok()
}
