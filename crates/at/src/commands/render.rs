//! `at render` command implementation.

use std::path::PathBuf;

use at_pipeline::{DiagnosticLog, RenderFormat, render_document};
use clap::Args;
use serde::Serialize;

use crate::context::Context;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Output format: xml, html, text or pdf.
    format: RenderFormat,

    /// Draft source, URL or document name.
    source: String,
}

#[derive(Serialize)]
struct RenderOutput<'a> {
    file: PathBuf,
    logs: &'a DiagnosticLog,
}

impl RenderArgs {
    /// Execute the render command.
    pub(crate) fn execute(self, ctx: &Context) -> Result<(), CliError> {
        let output = Output::new();
        let file = ctx.source(&self.source)?;

        let rendered = render_document(&ctx.toolchain, &file, self.format)?;
        let logs = rendered.log.unwrap_or_default();
        for warning in &logs.warnings {
            output.warning(&format!("Warning: {warning}"));
        }

        output.json(&RenderOutput {
            file: rendered.file.path().to_path_buf(),
            logs: &logs,
        })
    }
}
