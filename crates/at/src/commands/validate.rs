//! `at validate` command implementation.

use at_pipeline::validate;
use clap::Args;

use crate::context::Context;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the validate command.
#[derive(Args)]
pub(crate) struct ValidateArgs {
    /// Draft source, URL or document name.
    source: String,
}

impl ValidateArgs {
    /// Execute the validate command.
    pub(crate) fn execute(self, ctx: &Context) -> Result<(), CliError> {
        let output = Output::new();
        let file = ctx.source(&self.source)?;

        let report = validate(&ctx.toolchain, &file)?;
        if !report.log.errors.is_empty() {
            output.warning(&format!("{} error(s) found", report.log.errors.len()));
        }

        output.json(&report)
    }
}
