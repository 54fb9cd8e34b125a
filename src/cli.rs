//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use formscan_core::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};

/// Batch-analyze form documents for completion complexity.
///
/// Formscan downloads documents, extracts their text, scores how hard each
/// form is to fill in and keeps every result in a local SQLite database.
#[derive(Parser, Debug)]
#[command(name = "formscan")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file (default: $XDG_CONFIG_HOME/formscan/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SQLite database path (overrides the config file)
    #[arg(long, global = true, value_name = "FILE")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, score and store a batch of documents
    Analyze(AnalyzeArgs),
    /// Show stored analyses, most recent first
    List(ListArgs),
    /// Show aggregate counts by complexity level and industry
    Summary(SummaryArgs),
    /// Export stored analyses as JSON
    Export(ExportArgs),
}

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// Document URLs (read from --file or stdin when omitted)
    pub urls: Vec<String>,

    /// Text file with one URL per line
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Concurrent workers (1-64, overrides the config file)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub concurrency: Option<u8>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Maximum number of records to show
    #[arg(short = 'n', long, default_value_t = DEFAULT_LIST_LIMIT, value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_LIST_LIMIT)))]
    pub limit: u32,

    /// Number of most recent records to skip
    #[arg(long, default_value_t = 0)]
    pub offset: u64,
}

#[derive(clap::Args, Debug)]
pub struct SummaryArgs {
    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Maximum number of records to export
    #[arg(short = 'n', long, default_value_t = MAX_LIST_LIMIT, value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_LIST_LIMIT)))]
    pub limit: u32,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}
