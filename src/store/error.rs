//! Error types for analysis store operations.

use std::fmt;

use thiserror::Error;

const SQLITE_BUSY: u32 = 5;
const SQLITE_LOCKED: u32 = 6;
const SQLITE_CONSTRAINT: u32 = 19;

/// Coarse cause of a failed database call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Another writer held the lock past the busy timeout.
    BusyOrLocked,
    /// A CHECK, UNIQUE or NOT NULL constraint refused the row.
    ConstraintViolation,
    /// No pooled connection could be obtained.
    PoolUnavailable,
    Other,
}

impl DbErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => Self::PoolUnavailable,
            sqlx::Error::Database(db_error) => Self::from_database_error(db_error.as_ref()),
            _ => Self::Other,
        }
    }

    fn from_database_error(db_error: &(dyn sqlx::error::DatabaseError + 'static)) -> Self {
        // Extended result codes keep the primary code in the low byte.
        let primary = db_error
            .code()
            .and_then(|code| code.parse::<u32>().ok())
            .map(|code| code & 0xff);
        match primary {
            Some(SQLITE_BUSY | SQLITE_LOCKED) => Self::BusyOrLocked,
            Some(SQLITE_CONSTRAINT) => Self::ConstraintViolation,
            _ if db_error.message().contains("database is locked") => Self::BusyOrLocked,
            _ if db_error.is_check_violation() || db_error.is_unique_violation() => {
                Self::ConstraintViolation
            }
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BusyOrLocked => "busy",
            Self::ConstraintViolation => "constraint",
            Self::PoolUnavailable => "pool",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures reading or writing stored analyses.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("analysis database failed ({kind}): {message}")]
    Database {
        kind: DbErrorKind,
        message: String,
    },

    /// A stored row could not be decoded back into a profile.
    #[error("corrupt analysis record {id}: {reason}")]
    CorruptRecord { id: i64, reason: String },

    #[error("list limit {limit} exceeds maximum of {max}")]
    LimitTooLarge { limit: u32, max: u32 },

    #[error("cannot encode records as JSON: {0}")]
    Serialize(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: DbErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}

impl StoreError {
    pub(crate) fn corrupt(id: i64, reason: impl Into<String>) -> Self {
        Self::CorruptRecord {
            id,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn database_kind(&self) -> Option<DbErrorKind> {
        if let Self::Database { kind, .. } = self {
            Some(*kind)
        } else {
            None
        }
    }

    /// True for lock contention that outlasted the busy timeout.
    #[must_use]
    pub fn is_busy_or_locked(&self) -> bool {
        self.database_kind() == Some(DbErrorKind::BusyOrLocked)
    }
}
