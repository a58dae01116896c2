//! AT CLI - Internet-Draft author tools.
//!
//! Provides commands for:
//! - `render`: Convert a draft to XML, HTML, text or PDF
//! - `validate`: Report xml2rfc diagnostics and idnits output
//! - `idnits`: Check a draft with idnits
//! - `diff`: Compare two drafts, or a draft with its latest revision
//! - `abnf extract` / `abnf parse`: Work with ABNF using BAP
//! - `svgcheck`: Check and repair SVG artwork
//! - `versions`: Show versions of the external tools

mod commands;
mod context;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{AbnfCommand, DiffArgs, IdnitsArgs, RenderArgs, SvgcheckArgs, ValidateArgs};
use context::Context;
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// AT - Internet-Draft author tools.
#[derive(Parser)]
#[command(name = "at", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
pub(crate) struct GlobalArgs {
    /// Path to configuration file (default: auto-discover at.toml).
    #[arg(short, long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Scratch directory for working files (overrides config).
    #[arg(long, global = true)]
    pub(crate) scratch_dir: Option<PathBuf>,

    /// Datatracker API key, checked when `registry.auth_url` is configured.
    #[arg(long, global = true, env = "AT_API_KEY", hide_env_values = true)]
    pub(crate) api_key: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a draft as xml, html, text or pdf.
    Render(RenderArgs),
    /// Validate a draft.
    Validate(ValidateArgs),
    /// Run idnits on a draft.
    Idnits(IdnitsArgs),
    /// Compare two drafts.
    Diff(DiffArgs),
    /// ABNF extraction and parsing.
    #[command(subcommand)]
    Abnf(AbnfCommand),
    /// Check an SVG image against the RFC profile.
    Svgcheck(SvgcheckArgs),
    /// Show versions of the external tools.
    Versions,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.global.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = Context::new(&cli.global).and_then(|ctx| match cli.command {
        Commands::Render(args) => args.execute(&ctx),
        Commands::Validate(args) => args.execute(&ctx),
        Commands::Idnits(args) => args.execute(&ctx),
        Commands::Diff(args) => args.execute(&ctx),
        Commands::Abnf(cmd) => cmd.execute(&ctx),
        Commands::Svgcheck(args) => args.execute(&ctx),
        Commands::Versions => commands::versions::execute(&ctx, VERSION),
    });

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
