//! SVG profile checking.
//!
//! svgcheck writes its report to stderr and the repaired image to `--out`,
//! so stderr is the payload here rather than noise.

use std::fs;

use serde::Serialize;

use crate::error::PipelineError;
use crate::logs::strip_dir;
use crate::scratch::WorkingFile;
use crate::tool::{Tool, Toolchain, path_arg};

/// Outcome of an svgcheck run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SvgCheckReport {
    /// Whether the input already conformed to the RFC SVG profile.
    pub passed: bool,
    /// Checker report with scratch paths removed.
    pub report: String,
    /// Repaired SVG, when one was produced.
    pub svg: Option<String>,
}

/// Check `svg` and repair it into `<stem>.parsed.svg` beside it.
pub fn svgcheck(toolchain: &Toolchain, svg: &WorkingFile) -> Result<SvgCheckReport, PipelineError> {
    let stem = svg
        .path()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parsed = svg.dir().join(format!("{stem}.parsed.svg"));

    tracing::debug!(file = %svg.file_name(), "Running svgcheck");
    let args = vec![
        "--no-network".to_owned(),
        "--always-emit".to_owned(),
        "--repair".to_owned(),
        "--out".to_owned(),
        path_arg(&parsed),
        path_arg(svg.path()),
    ];
    let output = toolchain.run(Tool::Svgcheck, &args)?;

    let passed = output.is_success();
    if !passed {
        tracing::info!(code = ?output.code, "svgcheck reported problems");
    }

    let repaired = if parsed.exists() {
        let bytes = fs::read(&parsed)?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    } else {
        None
    };

    Ok(SvgCheckReport {
        passed,
        report: strip_dir(&output.stderr_lossy(), svg.path()),
        svg: repaired,
    })
}
