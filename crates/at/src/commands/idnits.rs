//! `at idnits` command implementation.

use at_pipeline::{ExtractionMode, IdnitsOptions, idnits, to_canonical_text};
use clap::{ArgAction, Args};

use crate::context::Context;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the idnits command.
#[derive(Args)]
pub(crate) struct IdnitsArgs {
    /// Draft source, URL or document name.
    source: String,

    /// Increase idnits verbosity (up to twice).
    #[arg(long = "nits-verbose", action = ArgAction::Count)]
    nits_verbose: u8,

    /// Show the draft text alongside the nits.
    #[arg(long)]
    show_text: bool,

    /// Year to expect in the copyright boilerplate.
    #[arg(long)]
    year: Option<u16>,

    /// Only report what blocks submission.
    #[arg(long)]
    submit_check: bool,
}

impl IdnitsArgs {
    fn options(&self) -> IdnitsOptions {
        IdnitsOptions {
            verbose: self.nits_verbose,
            show_text: self.show_text,
            year: self.year,
            submit_check: self.submit_check,
        }
    }

    /// Execute the idnits command.
    pub(crate) fn execute(self, ctx: &Context) -> Result<(), CliError> {
        let file = ctx.source(&self.source)?;
        let text = to_canonical_text(&ctx.toolchain, &file, ExtractionMode::Full)?;

        let report = idnits(&ctx.toolchain, &text.file, &self.options())?;
        Output::new().result(&report)
    }
}
