//! `at svgcheck` command implementation.

use std::path::PathBuf;

use at_pipeline::{UploadPurpose, svgcheck};
use clap::Args;

use crate::context::Context;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the svgcheck command.
#[derive(Args)]
pub(crate) struct SvgcheckArgs {
    /// SVG file to check.
    file: PathBuf,
}

impl SvgcheckArgs {
    /// Execute the svgcheck command.
    pub(crate) fn execute(self, ctx: &Context) -> Result<(), CliError> {
        let output = Output::new();
        let svg = ctx.upload(&self.file, UploadPurpose::Svg)?;

        let report = svgcheck(&ctx.toolchain, &svg)?;
        if !report.passed {
            output.warning("SVG does not conform to the RFC profile");
        }

        output.json(&report)
    }
}
