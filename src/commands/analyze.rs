//! Analyze command handler: run one batch and report its outcome.

use std::io::{self, IsTerminal, Read};

use anyhow::{Context, Result};
use formscan_core::{
    BatchOrchestrator, BatchStatus, ContentExtractor, DocumentFetcher, parse_url_list,
};
use tracing::{info, warn};

use super::open_store;
use crate::app_config::RuntimeConfig;
use crate::cli::AnalyzeArgs;
use crate::progress::BatchSpinner;

pub async fn run_analyze_command(
    args: &AnalyzeArgs,
    mut runtime: RuntimeConfig,
    use_spinner: bool,
) -> Result<()> {
    let Some(input_text) = read_input(args)? else {
        info!("No input provided. Pass URLs as arguments, use --file, or pipe them via stdin.");
        info!("Example: echo 'https://example.com/form.pdf' | formscan analyze");
        return Ok(());
    };

    let url_list = parse_url_list(&input_text);
    if url_list.is_empty() {
        info!(skipped = url_list.skipped, "No URLs found in input");
        return Ok(());
    }
    if url_list.skipped > 0 {
        warn!(skipped = url_list.skipped, "Skipped lines that are not URLs");
    }

    if let Some(concurrency) = args.concurrency {
        runtime.batch.concurrency = usize::from(concurrency);
    }

    let store = open_store(&runtime).await?;
    let orchestrator = BatchOrchestrator::new(
        store,
        DocumentFetcher::with_options(runtime.fetcher),
        ContentExtractor::new(),
        runtime.batch.clone(),
    )
    .context("Failed to start batch orchestrator")?;

    let handle = orchestrator.submit_batch(url_list.urls);
    let batch_id = handle.id();
    info!(batch_id = %batch_id, "Batch started");

    let spinner = BatchSpinner::start(use_spinner, orchestrator.clone(), batch_id);
    let status = handle.wait().await;
    spinner.finish().await;

    print_status(&status);
    orchestrator.store().database().clone().close().await;
    Ok(())
}

fn read_input(args: &AnalyzeArgs) -> Result<Option<String>> {
    if !args.urls.is_empty() {
        return Ok(Some(args.urls.join("\n")));
    }
    if let Some(path) = &args.file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read URL file '{}'", path.display()))?;
        return Ok(Some(text));
    }
    if io::stdin().is_terminal() {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read URLs from stdin")?;
    Ok(Some(buffer))
}

fn print_status(status: &BatchStatus) {
    println!(
        "Batch {}: {} of {} documents stored ({} with placeholder text), {} failed",
        status.id,
        status.stored,
        status.total,
        status.degraded,
        status.failures.len()
    );
    for failure in &status.failures {
        println!("  [{}] {}: {}", failure.stage, failure.url, failure.message);
    }
}
