//! Inkstone CLI: builds and inspects compiled dictionary artifacts.
//!
//! Provides `inkstone build` to compile resources into an artifact when they
//! changed, `inkstone check` to report whether an artifact is stale,
//! `inkstone inspect` to print an artifact's build record and provenance, and
//! `inkstone checksum` to print file CRC-32 values.

#![warn(missing_docs)]

mod build;
mod check;
mod checksum;
mod inspect;
mod payload;
mod pipeline;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Inkstone dictionary artifact builder.
#[derive(Parser, Debug)]
#[command(name = "inkstone", version, about = "Inkstone dictionary toolchain")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (info-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to an `inkstone.toml` file or the directory containing it.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile resources into an artifact unless it is already fresh.
    Build(BuildArgs),
    /// Report whether an artifact is fresh. Exits with 2 when stale.
    Check(CheckArgs),
    /// Print an artifact's build record and provenance.
    Inspect(InspectArgs),
    /// Print the CRC-32 of files.
    Checksum(ChecksumArgs),
}

/// Arguments for the `inkstone build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Resource kind declared in `inkstone.toml`.
    pub kind: String,

    /// Resource ids to compile.
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,

    /// Artifact path (default: `<staging_dir>/<first id>.<kind>.bin`).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Rebuild even if the artifact is fresh.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `inkstone check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Resource kind declared in `inkstone.toml`.
    pub kind: String,

    /// Resource ids the artifact was built from.
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,

    /// Artifact path (default: `<staging_dir>/<first id>.<kind>.bin`).
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the `inkstone inspect` subcommand.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Artifact to inspect.
    pub artifact: String,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `inkstone checksum` subcommand.
#[derive(Parser, Debug)]
pub struct ChecksumArgs {
    /// Files to checksum.
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<String>,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to log progress.
    pub verbose: bool,
    /// Optional path to a config file or directory.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Check(ref args) => check::run(args, &global),
        Command::Inspect(ref args) => inspect::run(args, &global),
        Command::Checksum(ref args) => checksum::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs a stderr subscriber. `RUST_LOG` overrides the flag-derived level.
fn init_logging(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(global)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_log_level(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        "error"
    } else if global.verbose {
        "info"
    } else {
        "warn"
    }
}
