//! Versions of the installed external tools.

use std::collections::BTreeMap;

use crate::tool::{Tool, Toolchain};

/// Ask every tool for `--version`.
///
/// Tools that are missing or fail map to `None`.
#[must_use]
pub fn tool_versions(toolchain: &Toolchain) -> BTreeMap<Tool, Option<String>> {
    Tool::ALL
        .into_iter()
        .map(|tool| (tool, tool_version(toolchain, tool)))
        .collect()
}

/// Version reported by one tool.
#[must_use]
pub fn tool_version(toolchain: &Toolchain, tool: Tool) -> Option<String> {
    let output = toolchain
        .run(tool, &["--version".to_owned()])
        .inspect_err(|e| tracing::info!(%tool, error = %e, "Version query failed"))
        .ok()?;

    if !output.is_success() {
        tracing::info!(%tool, error = %output.stderr_lossy(), "Version query failed");
        return None;
    }
    parse_version(tool.default_program(), &output.stdout_lossy())
}

/// Extract the version from `--version` output.
///
/// Takes the first non-blank line and drops a leading program name and
/// `=` separator, so `idnits 2.17.1` and `svgcheck = 0.9.0` both reduce to
/// the bare number.
fn parse_version(program: &str, stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).find(|line| !line.is_empty())?;
    let version = line
        .strip_prefix(program)
        .unwrap_or(line)
        .trim_start()
        .trim_start_matches('=')
        .trim();
    (!version.is_empty()).then(|| version.to_owned())
}
