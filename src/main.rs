//! CLI entry point for the formscan tool.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

mod app_config;
mod cli;
mod commands;
mod progress;

use app_config::{RuntimeConfig, load_config};
use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = load_config(args.config.as_deref())?;
    if loaded.loaded_from_file
        && let Some(path) = &loaded.path
    {
        debug!(path = %path.display(), "loaded config file");
    }
    let runtime = RuntimeConfig::resolve(&loaded.config, args.database.as_deref());
    debug!(?runtime, "effective configuration");

    match &args.command {
        Command::Analyze(analyze) => {
            info!("Formscan starting");
            let use_spinner = !args.quiet && io::stderr().is_terminal();
            commands::run_analyze_command(analyze, runtime, use_spinner).await
        }
        Command::List(list) => commands::run_list_command(list, &runtime).await,
        Command::Summary(summary) => commands::run_summary_command(summary, &runtime).await,
        Command::Export(export) => commands::run_export_command(export, &runtime).await,
    }
}
