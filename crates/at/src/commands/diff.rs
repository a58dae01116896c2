//! `at diff` command implementation.

use at_pipeline::{DiffMode, DiffRequest, ExtractionMode, WorkingFile, diff, to_canonical_text};
use clap::Args;

use crate::context::Context;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the diff command.
#[derive(Args)]
pub(crate) struct DiffArgs {
    /// First draft: source, URL or document name.
    doc_1: String,

    /// Second draft (default: the latest revision of the first, or the
    /// previous one when the first already is the latest).
    doc_2: Option<String>,

    /// Output a bare HTML table.
    #[arg(long)]
    table: bool,

    /// Word diff.
    #[arg(long)]
    wdiff: bool,

    /// Change bars.
    #[arg(long)]
    chbars: bool,

    /// Added and removed blocks.
    #[arg(long)]
    abdiff: bool,

    /// Compare the files as given, without text extraction.
    #[arg(long)]
    raw: bool,
}

impl DiffArgs {
    fn mode(&self) -> DiffMode {
        DiffMode::from_flags(self.table, self.wdiff, self.chbars, self.abdiff)
    }

    fn extraction(&self) -> ExtractionMode {
        if self.raw {
            ExtractionMode::Raw
        } else {
            ExtractionMode::Full
        }
    }

    /// Execute the diff command.
    pub(crate) fn execute(self, ctx: &Context) -> Result<(), CliError> {
        let output = Output::new();
        let first = ctx.source(&self.doc_1)?;

        let (old, new) = if let Some(doc_2) = &self.doc_2 {
            (first, ctx.source(doc_2)?)
        } else {
            let counterpart = ctx.fetcher.fetch_counterpart(&first)?;
            output.info(&format!("Comparing with {}", counterpart.file.file_name()));
            if counterpart.is_predecessor {
                (counterpart.file, first)
            } else {
                (first, counterpart.file)
            }
        };

        let old = self.text(ctx, &old)?;
        let new = self.text(ctx, &new)?;
        let html = diff(&ctx.toolchain, &DiffRequest::new(old, new, self.mode()))?;
        output.result(&html)
    }

    fn text(&self, ctx: &Context, file: &WorkingFile) -> Result<WorkingFile, CliError> {
        Ok(to_canonical_text(&ctx.toolchain, file, self.extraction())?.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: DiffArgs,
    }

    #[test]
    fn test_mode_from_flags() {
        let cli = TestCli::parse_from(["at", "draft-a-00.txt", "draft-a-01.txt", "--chbars", "--table"]);
        assert_eq!(cli.args.mode(), DiffMode::ChangeBars);
        assert_eq!(cli.args.doc_2.as_deref(), Some("draft-a-01.txt"));

        let cli = TestCli::parse_from(["at", "draft-a-00.txt", "--table"]);
        assert_eq!(cli.args.mode(), DiffMode::Table);
        assert!(cli.args.doc_2.is_none());
    }

    #[test]
    fn test_raw_skips_extraction() {
        let cli = TestCli::parse_from(["at", "a.txt", "b.txt", "--raw"]);
        assert_eq!(cli.args.extraction(), ExtractionMode::Raw);

        let cli = TestCli::parse_from(["at", "a.txt", "b.txt"]);
        assert_eq!(cli.args.extraction(), ExtractionMode::Full);
    }
}
