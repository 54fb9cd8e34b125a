//! Summary command handler: aggregate counts across all stored analyses.

use std::fmt::Write as _;

use anyhow::Result;
use formscan_core::AnalysisSummary;

use super::open_store;
use crate::app_config::RuntimeConfig;
use crate::cli::SummaryArgs;

pub async fn run_summary_command(args: &SummaryArgs, runtime: &RuntimeConfig) -> Result<()> {
    let store = open_store(runtime).await?;
    let summary = store.summarize().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_summary(&summary));
    }
    Ok(())
}

fn render_summary(summary: &AnalysisSummary) -> String {
    let mut out = format!("Total analyses: {}\n", summary.total_count);

    out.push_str("By complexity level:\n");
    for (level, count) in &summary.count_by_complexity_level {
        let _ = writeln!(out, "  {:<10} {count}", level.as_str());
    }

    out.push_str("By industry:\n");
    for (industry, count) in &summary.count_by_industry_vertical {
        let _ = writeln!(out, "  {:<10} {count}", industry.as_str());
    }
    out
}
