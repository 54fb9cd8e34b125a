//! Formscan Core Library
//!
//! Batch ingestion pipeline that downloads form documents, extracts their
//! text, scores their completion complexity with fixed heuristics and
//! keeps every result in a queryable SQLite store.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - HTTP document retrieval into private work directories
//! - [`extract`] - Ordered text extraction strategies with a placeholder fallback
//! - [`scoring`] - Rule tables and the heuristic complexity scorer
//! - [`db`] - Database connection and schema management
//! - [`store`] - Persistence and aggregate queries over complexity profiles
//! - [`batch`] - Background orchestration of fetch → extract → score → store
//! - [`input`] - URL list parsing

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod db;
pub mod extract;
pub mod fetch;
pub mod input;
pub mod scoring;
pub mod store;

// Re-export commonly used types
pub use batch::{
    BatchError, BatchHandle, BatchId, BatchOptions, BatchOrchestrator, BatchState, BatchStatus,
    DEFAULT_CONCURRENCY, DEFAULT_RETAINED_BATCHES, FailureStage, ItemFailure,
};
pub use db::{Database, DbError, DbOptions};
pub use extract::{ContentExtractor, ExtractedText, PLACEHOLDER_TEXT};
pub use fetch::{CourtesyDelay, DocumentFetcher, FetchError, FetcherOptions};
pub use input::{UrlList, parse_url_list};
pub use scoring::{
    ComplexityLevel, ComplexityProfile, DocumentContext, HeuristicScorer, IndustryVertical,
};
pub use store::{
    AnalysisStore, AnalysisSummary, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT, ProfileRecord,
    StoreError, StoredProfile,
};
