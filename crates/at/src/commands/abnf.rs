//! `at abnf` command implementations.

use std::path::PathBuf;

use at_pipeline::{ExtractionMode, UploadPurpose, extract_abnf, parse_abnf, to_canonical_text};
use clap::{Args, Subcommand};

use crate::context::Context;
use crate::error::CliError;
use crate::output::Output;

/// ABNF subcommands.
#[derive(Subcommand)]
pub(crate) enum AbnfCommand {
    /// Extract the ABNF rules of a draft.
    Extract(ExtractArgs),
    /// Parse an ABNF file.
    Parse(ParseArgs),
}

impl AbnfCommand {
    /// Execute the selected subcommand.
    pub(crate) fn execute(self, ctx: &Context) -> Result<(), CliError> {
        match self {
            Self::Extract(args) => args.execute(ctx),
            Self::Parse(args) => args.execute(ctx),
        }
    }
}

/// Arguments for `abnf extract`.
#[derive(Args)]
pub(crate) struct ExtractArgs {
    /// Draft source, URL or document name.
    source: String,
}

impl ExtractArgs {
    fn execute(self, ctx: &Context) -> Result<(), CliError> {
        let file = ctx.source(&self.source)?;
        let text = to_canonical_text(&ctx.toolchain, &file, ExtractionMode::Full)?;

        Output::new().result(&extract_abnf(&ctx.toolchain, &text.file))
    }
}

/// Arguments for `abnf parse`.
#[derive(Args)]
pub(crate) struct ParseArgs {
    /// File holding ABNF rules (.txt).
    file: PathBuf,
}

impl ParseArgs {
    fn execute(self, ctx: &Context) -> Result<(), CliError> {
        let file = ctx.upload(&self.file, UploadPurpose::Document)?;

        Output::new().json(&parse_abnf(&ctx.toolchain, &file))
    }
}
