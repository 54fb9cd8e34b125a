//! Export command handler: dump stored analyses as a JSON array.

use anyhow::{Context, Result};
use tracing::info;

use super::open_store;
use crate::app_config::RuntimeConfig;
use crate::cli::ExportArgs;

pub async fn run_export_command(args: &ExportArgs, runtime: &RuntimeConfig) -> Result<()> {
    let store = open_store(runtime).await?;
    let json = store.export_json(args.limit).await?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, json.as_bytes())
                .await
                .with_context(|| format!("Failed to write export file '{}'", path.display()))?;
            info!(path = %path.display(), "Export written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
