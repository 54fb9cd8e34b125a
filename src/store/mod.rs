//! Durable storage for complexity profiles.
//!
//! [`AnalysisStore`] persists every scored document as one `form_analyses`
//! row. Inserts are append-only; the store assigns the id and a
//! `created_at` that never precedes an earlier record's, so listing by
//! `created_at DESC, id DESC` is stable under concurrent writers.
//!
//! # Example
//!
//! ```no_run
//! use formscan_core::{AnalysisStore, Database, HeuristicScorer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new_in_memory().await?;
//! let store = AnalysisStore::new(db);
//!
//! let profile = HeuristicScorer::new().score("Patient intake form", None);
//! let id = store.insert(&profile).await?;
//! let latest = store.list(10, 0).await?;
//! assert_eq!(latest[0].id, id);
//! # Ok(())
//! # }
//! ```

mod error;
mod record;

use sqlx::Row;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::scoring::{ComplexityLevel, ComplexityProfile, IndustryVertical};

pub use error::{DbErrorKind, StoreError};
pub use record::{AnalysisSummary, ProfileRecord, StoredProfile};

use record::ANALYSIS_DATE_FORMAT;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Largest page a single `list` call may return.
pub const MAX_LIST_LIMIT: u32 = 10_000;

/// Page size used when a caller does not choose one.
pub const DEFAULT_LIST_LIMIT: u32 = 100;

/// Analysis store wrapping a database connection.
#[derive(Debug, Clone)]
pub struct AnalysisStore {
    db: Database,
}

impl AnalysisStore {
    /// Creates a new store with the given database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the underlying database.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Persists one profile and returns its newly assigned id.
    ///
    /// Derived columns (subvertical, complexity score and level, time
    /// estimate, assistance level) are written from the profile's own
    /// accessors, so a stored row is always internally consistent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails; nothing is stored.
    #[instrument(skip(self, profile), fields(form_title = %profile.title, industry = %profile.industry_vertical))]
    pub async fn insert(&self, profile: &ComplexityProfile) -> Result<i64> {
        let time = profile.time_estimate();
        let [driver_1, driver_2, driver_3] = &profile.key_drivers;

        let row = sqlx::query(
            r"INSERT INTO form_analyses (
                form_id,
                form_title,
                entity_name,
                industry_vertical,
                industry_subvertical,
                complexity_score,
                complexity_level,
                base_score,
                industry_score,
                multiplier,
                page_count,
                signature_count,
                field_count,
                attachment_count,
                condition_count,
                third_party_count,
                data_validation_count,
                key_driver_1,
                key_driver_2,
                key_driver_3,
                time_estimate_min,
                time_estimate_max,
                assistance_level,
                notarization_required,
                witnesses_required,
                identification_required,
                deadline_present,
                conditional_field_logic,
                other_form_dependencies,
                confidence_score,
                analysis_date,
                notes,
                source_url,
                file_path,
                created_at
              )
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                      ?, ?, ?, ?, ?, ?, ?, ?, ?,
                      max(strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                          COALESCE((SELECT MAX(created_at) FROM form_analyses), '')))
              RETURNING id",
        )
        .bind(&profile.form_id)
        .bind(&profile.title)
        .bind(&profile.entity_name)
        .bind(profile.industry_vertical.as_str())
        .bind(profile.industry_subvertical())
        .bind(i64::from(profile.complexity_score()))
        .bind(profile.complexity_level().as_str())
        .bind(i64::from(profile.scores.base_score()))
        .bind(i64::from(profile.scores.industry_score()))
        .bind(profile.scores.multiplier())
        .bind(i64::from(profile.counts.page_count))
        .bind(i64::from(profile.counts.signature_count))
        .bind(i64::from(profile.counts.field_count))
        .bind(i64::from(profile.counts.attachment_count))
        .bind(i64::from(profile.counts.condition_count))
        .bind(i64::from(profile.counts.third_party_count))
        .bind(i64::from(profile.counts.data_validation_count))
        .bind(driver_1)
        .bind(driver_2)
        .bind(driver_3)
        .bind(i64::from(time.min_minutes()))
        .bind(i64::from(time.max_minutes()))
        .bind(profile.assistance_level().as_str())
        .bind(profile.flags.notarization_required.as_str())
        .bind(profile.flags.witnesses_required.as_str())
        .bind(profile.flags.identification_required.as_str())
        .bind(profile.flags.deadline_present.as_str())
        .bind(profile.flags.conditional_field_logic.as_str())
        .bind(profile.flags.other_form_dependencies.as_str())
        .bind(i64::from(profile.confidence_score))
        .bind(
            profile
                .analysis_date
                .format(ANALYSIS_DATE_FORMAT)
                .to_string(),
        )
        .bind(&profile.notes)
        .bind(profile.source_url.as_deref())
        .bind(profile.file_path.as_deref())
        .fetch_one(self.db.pool())
        .await?;

        let id: i64 = row.get("id");
        debug!(id, "stored analysis");
        Ok(id)
    }

    /// Returns up to `limit` profiles, most recent first, skipping `offset`.
    ///
    /// A `limit` of zero returns an empty page.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LimitTooLarge`] above [`MAX_LIST_LIMIT`],
    /// [`StoreError::CorruptRecord`] if a row cannot be decoded, or
    /// [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, limit: u32, offset: u64) -> Result<Vec<StoredProfile>> {
        self.list_records(limit, offset)
            .await?
            .into_iter()
            .map(StoredProfile::try_from)
            .collect()
    }

    /// Same page as [`list`](Self::list), as flat column records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LimitTooLarge`] above [`MAX_LIST_LIMIT`], or
    /// [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn list_records(&self, limit: u32, offset: u64) -> Result<Vec<ProfileRecord>> {
        if limit > MAX_LIST_LIMIT {
            return Err(StoreError::LimitTooLarge {
                limit,
                max: MAX_LIST_LIMIT,
            });
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let records = sqlx::query_as::<_, ProfileRecord>(
            r"SELECT * FROM form_analyses
              ORDER BY created_at DESC, id DESC
              LIMIT ? OFFSET ?",
        )
        .bind(i64::from(limit))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(self.db.pool())
        .await?;

        Ok(records)
    }

    /// Serializes up to `limit` most recent records as a pretty JSON array
    /// of flat column/value objects.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LimitTooLarge`] above [`MAX_LIST_LIMIT`],
    /// [`StoreError::Serialize`] if encoding fails, or
    /// [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn export_json(&self, limit: u32) -> Result<String> {
        let records = self.list_records(limit, 0).await?;
        debug!(records = records.len(), "exporting analyses");
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Fetches a single profile by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptRecord`] if the row cannot be decoded,
    /// or [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<StoredProfile>> {
        let record =
            sqlx::query_as::<_, ProfileRecord>(r"SELECT * FROM form_analyses WHERE id = ?")
                .bind(id)
                .fetch_optional(self.db.pool())
                .await?;

        record.map(StoredProfile::try_from).transpose()
    }

    /// Returns the number of stored profiles.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(r"SELECT COUNT(*) FROM form_analyses")
            .fetch_one(self.db.pool())
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Counts all profiles in total, per complexity level and per industry.
    ///
    /// All three aggregates are read inside one transaction, so they agree
    /// with each other even while other tasks insert.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptRecord`] if a grouped column holds an
    /// unknown value, or [`StoreError::Database`] if a query fails.
    #[instrument(skip(self))]
    pub async fn summarize(&self) -> Result<AnalysisSummary> {
        let mut tx = self.db.pool().begin().await?;

        let (total,): (i64,) = sqlx::query_as(r"SELECT COUNT(*) FROM form_analyses")
            .fetch_one(&mut *tx)
            .await?;

        let by_level: Vec<(String, i64)> = sqlx::query_as(
            r"SELECT complexity_level, COUNT(*) FROM form_analyses GROUP BY complexity_level",
        )
        .fetch_all(&mut *tx)
        .await?;

        let by_industry: Vec<(String, i64)> = sqlx::query_as(
            r"SELECT industry_vertical, COUNT(*) FROM form_analyses GROUP BY industry_vertical",
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut summary = AnalysisSummary {
            total_count: u64::try_from(total).unwrap_or(0),
            ..AnalysisSummary::default()
        };
        for (level, count) in by_level {
            let level: ComplexityLevel = level.parse().map_err(|e| StoreError::corrupt(0, e))?;
            summary
                .count_by_complexity_level
                .insert(level, u64::try_from(count).unwrap_or(0));
        }
        for (industry, count) in by_industry {
            let industry: IndustryVertical =
                industry.parse().map_err(|e| StoreError::corrupt(0, e))?;
            summary
                .count_by_industry_vertical
                .insert(industry, u64::try_from(count).unwrap_or(0));
        }

        Ok(summary)
    }
}
