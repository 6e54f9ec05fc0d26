//! pixcache CLI: operator commands for the memoization store.
//!
//! Provides `pixcache info` to inspect the store and `pixcache purge` to
//! empty or delete it, the remedy for a full or corrupt store.

#![warn(missing_docs)]

mod info;
mod purge;
mod settings;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

/// pixcache: persistent memoization for image-processing calls.
#[derive(Parser, Debug)]
#[command(name = "pixcache", version, about = "pixcache store maintenance")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `pixcache.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show where the store lives and how full it is.
    Info(InfoArgs),
    /// Remove every cached entry.
    Purge(PurgeArgs),
}

/// Arguments for the `pixcache info` subcommand.
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `pixcache purge` subcommand.
#[derive(Parser, Debug)]
pub struct PurgeArgs {
    /// Delete the store files instead of emptying the database, which also
    /// returns the disk space.
    #[arg(long)]
    pub delete: bool,
}

/// Output format for `info`.
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
    /// Optional path to a config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let global = GlobalArgs {
        quiet: cli.quiet,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Info(ref args) => info::run(args, &global),
        Command::Purge(ref args) => purge::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs `env_logger`; `RUST_LOG` applies unless a flag overrides it.
fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    } else if quiet {
        builder.filter_level(LevelFilter::Error);
    }
    builder.format_timestamp(None).init();
}
