//! SQLite pool setup for the analysis database.
//!
//! Opening a [`Database`] creates the file when missing, switches it to WAL
//! journaling so readers never block the batch writers, and applies the
//! embedded migrations before handing out the pool.
//!
//! # Example
//!
//! ```no_run
//! use formscan_core::Database;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("formscan.db")).await?;
//! let store = formscan_core::AnalysisStore::new(db);
//! # let _ = store;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::instrument;

/// Pool size used unless the config file overrides it.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits on a locked database before giving up.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

/// Errors opening or migrating the analysis database.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("cannot open analysis database: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("cannot apply schema migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Pool tuning for file-backed databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbOptions {
    pub max_connections: u32,
    pub busy_timeout_ms: u32,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Migrated SQLite pool. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// [`with_options`](Self::with_options) using [`DbOptions::default`].
    ///
    /// # Errors
    ///
    /// Same as [`with_options`](Self::with_options).
    pub async fn new(db_path: &Path) -> Result<Self, DbError> {
        Self::with_options(db_path, DbOptions::default()).await
    }

    /// Opens the database file at `db_path`, creating and migrating it as needed.
    ///
    /// # Errors
    ///
    /// [`DbError::Connection`] when the file cannot be opened and
    /// [`DbError::Migration`] when the schema cannot be brought up to date.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn with_options(db_path: &Path, options: DbOptions) -> Result<Self, DbError> {
        let connect_options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(u64::from(options.busy_timeout_ms)));

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections.max(1))
            .connect_with(connect_options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Private in-memory database held by a single connection.
    ///
    /// # Errors
    ///
    /// Same as [`with_options`](Self::with_options).
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Reports whether the journal mode is WAL.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Connection`] if the pragma query fails.
    #[instrument(skip(self))]
    pub async fn is_wal_enabled(&self) -> Result<bool, DbError> {
        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&self.pool)
            .await?;
        Ok(mode.eq_ignore_ascii_case("wal"))
    }

    /// Waits for checked-out connections and closes the pool.
    #[instrument(skip(self))]
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_starts_empty() {
        let db = Database::new_in_memory().await.unwrap();
        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM form_analyses")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn test_check_constraint_rejects_unknown_level() {
        let db = Database::new_in_memory().await.unwrap();

        let result = sqlx::query(
            r"INSERT INTO form_analyses (
                form_id, form_title, entity_name, industry_vertical, industry_subvertical,
                complexity_score, complexity_level, base_score, industry_score, multiplier,
                page_count, signature_count, field_count, attachment_count, condition_count,
                third_party_count, data_validation_count, key_driver_1, key_driver_2,
                key_driver_3, time_estimate_min, time_estimate_max, assistance_level,
                notarization_required, witnesses_required, identification_required,
                deadline_present, conditional_field_logic, other_form_dependencies,
                confidence_score, analysis_date, notes, created_at)
              VALUES ('PDF-1', 't', 'e', 'Unknown', 'Unknown', 0, 'Extreme', 0, 0, 1.0,
                1, 0, 0, 0, 0, 0, 0, 'a', 'b', 'c', 5, 15, 'None',
                'No', 'No', 'No', 'No', 'No', 'No', 85, '2024-01-01', '', '2024-01-01T00:00:00.000Z')",
        )
        .execute(db.pool())
        .await;

        assert!(result.is_err(), "'Extreme' is not a complexity level");
    }

    #[tokio::test]
    async fn test_file_database_uses_wal_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyses.db");

        let db = Database::new(&path).await.unwrap();
        assert!(db.is_wal_enabled().await.unwrap());
        db.close().await;

        let options = DbOptions {
            max_connections: 2,
            busy_timeout_ms: 100,
        };
        let reopened = Database::with_options(&path, options).await.unwrap();
        assert!(reopened.is_wal_enabled().await.unwrap());
    }
}
