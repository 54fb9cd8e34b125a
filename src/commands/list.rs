//! List command handler: show stored analyses, most recent first.

use anyhow::Result;
use formscan_core::StoredProfile;

use super::open_store;
use crate::app_config::RuntimeConfig;
use crate::cli::ListArgs;

pub async fn run_list_command(args: &ListArgs, runtime: &RuntimeConfig) -> Result<()> {
    let store = open_store(runtime).await?;
    let records = store.list(args.limit, args.offset).await?;

    if records.is_empty() {
        println!("No analyses stored in {}.", runtime.database_path.display());
        return Ok(());
    }

    for record in &records {
        println!("{}", render_row(record));
    }
    Ok(())
}

fn render_row(record: &StoredProfile) -> String {
    let profile = &record.profile;
    let time = profile.time_estimate();
    format!(
        "#{id:<6} {created} {level:<8} {score:>3} {industry:<7} {min}-{max}min  {title}  {source}",
        id = record.id,
        created = record.created_at.format("%Y-%m-%d %H:%M:%S"),
        level = profile.complexity_level().as_str(),
        score = profile.complexity_score(),
        industry = profile.industry_vertical.as_str(),
        min = time.min_minutes(),
        max = time.max_minutes(),
        title = profile.title,
        source = profile.source_url.as_deref().unwrap_or("-"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use formscan_core::HeuristicScorer;

    #[test]
    fn test_render_row_contains_key_columns() {
        let profile = HeuristicScorer::new().score(
            "Veterans Benefits Application\nState of Ohio",
            Some("https://gov.example/vet.pdf"),
        );
        let record = StoredProfile {
            id: 12,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap(),
            profile,
        };
        let row = render_row(&record);
        assert!(row.starts_with("#12"));
        assert!(row.contains("2024-06-01 08:30:00"));
        assert!(row.contains("PubSec"));
        assert!(row.contains("Veterans Benefits Application"));
        assert!(row.contains("https://gov.example/vet.pdf"));
    }
}
