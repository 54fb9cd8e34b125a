//! CLI command handlers.

mod analyze;
mod export;
mod list;
mod summary;

use anyhow::{Context, Result};
use formscan_core::{AnalysisStore, Database};

use crate::app_config::RuntimeConfig;

pub use analyze::run_analyze_command;
pub use export::run_export_command;
pub use list::run_list_command;
pub use summary::run_summary_command;

/// Opens (creating and migrating if needed) the configured analysis database.
async fn open_store(runtime: &RuntimeConfig) -> Result<AnalysisStore> {
    let db = Database::with_options(&runtime.database_path, runtime.db)
        .await
        .with_context(|| {
            format!(
                "Failed to open database '{}'",
                runtime.database_path.display()
            )
        })?;
    Ok(AnalysisStore::new(db))
}
