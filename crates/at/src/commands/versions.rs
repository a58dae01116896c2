//! `at versions` command implementation.

use std::collections::BTreeMap;

use at_pipeline::tool_versions;

use crate::context::Context;
use crate::error::CliError;
use crate::output::Output;

/// Print the versions of the external tools and of this program.
pub(crate) fn execute(ctx: &Context, version: &str) -> Result<(), CliError> {
    let mut versions: BTreeMap<String, Option<String>> = tool_versions(&ctx.toolchain)
        .into_iter()
        .map(|(tool, version)| (tool.key().to_owned(), version))
        .collect();
    versions.insert("author-tools".to_owned(), Some(version.to_owned()));

    Output::new().json(&versions)
}
