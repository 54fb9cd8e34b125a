//! Background batch orchestration.
//!
//! The [`BatchOrchestrator`] runs each submitted URL through
//! fetch → extract → score → store on a semaphore-bounded pool of tokio
//! tasks. A failure at any stage is recorded against that URL in the
//! batch's [`BatchStatus`] and the remaining URLs carry on.
//!
//! # Concurrency Model
//!
//! - Each batch runs in its own spawned task, detached from the caller
//! - Each URL runs in its own task holding one semaphore permit
//! - The semaphore is shared by every batch of one orchestrator
//! - Every URL gets a private `<work_dir>/<batch_id>/<index>/` directory
//!
//! # Example
//!
//! ```no_run
//! use formscan_core::{AnalysisStore, BatchOptions, BatchOrchestrator, Database};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = AnalysisStore::new(Database::new_in_memory().await?);
//! let orchestrator = BatchOrchestrator::with_defaults(store, BatchOptions::default())?;
//!
//! let handle = orchestrator.submit_batch(vec!["https://example.com/form.pdf".to_string()]);
//! println!("submitted batch {}", handle.id());
//! let status = handle.wait().await;
//! println!("stored {} of {}", status.stored, status.total);
//! # Ok(())
//! # }
//! ```

mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::extract::ContentExtractor;
use crate::fetch::DocumentFetcher;
use crate::fetch::constants::FETCH_TIMEOUT_SECS;
use crate::scoring::{DocumentContext, HeuristicScorer};
use crate::store::AnalysisStore;

pub use status::{
    BatchId, BatchRegistry, BatchState, BatchStatus, DEFAULT_RETAINED_BATCHES, FailureStage,
    ItemFailure,
};

/// Minimum allowed worker count.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed worker count.
pub const MAX_CONCURRENCY: usize = 64;

/// Default worker count if not specified.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Error type for orchestrator construction.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The work directory could not be created.
    #[error("cannot create work directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Tuning for a [`BatchOrchestrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Number of URLs processed at once.
    pub concurrency: usize,
    /// Parent directory for per-item temporary artifacts.
    pub work_dir: PathBuf,
    /// Timeout for each document fetch.
    pub fetch_timeout: Duration,
    /// Completed batch statuses kept for `status` and `list_batches`.
    pub retained_batches: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            work_dir: std::env::temp_dir().join("formscan"),
            fetch_timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
            retained_batches: DEFAULT_RETAINED_BATCHES,
        }
    }
}

/// Handle to a submitted batch.
///
/// Dropping the handle does not stop the batch.
#[derive(Debug)]
pub struct BatchHandle {
    id: BatchId,
    total: usize,
    registry: BatchRegistry,
    task: JoinHandle<Option<BatchStatus>>,
}

impl BatchHandle {
    #[must_use]
    pub fn id(&self) -> BatchId {
        self.id
    }

    /// Waits for every URL to be attempted and returns the final status.
    ///
    /// The status is captured when the batch completes, so it is returned
    /// even if the registry has since forgotten the batch.
    pub async fn wait(self) -> BatchStatus {
        let snapshot = match self.task.await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(batch_id = %self.id, error = %e, "batch task panicked");
                self.registry.complete(self.id)
            }
        };
        snapshot.unwrap_or_else(|| {
            let mut status = BatchStatus::new(self.id, self.total);
            status.state = BatchState::Completed;
            status
        })
    }
}

/// Runs batches of URLs through the analysis pipeline.
///
/// Cloning is cheap and shares the worker pool and status registry.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    store: AnalysisStore,
    fetcher: DocumentFetcher,
    extractor: ContentExtractor,
    scorer: HeuristicScorer,
    semaphore: Arc<Semaphore>,
    registry: BatchRegistry,
    options: Arc<BatchOptions>,
}

impl BatchOrchestrator {
    /// Creates an orchestrator with explicit pipeline components.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidConcurrency`] if the worker count is
    /// outside 1-64, or [`BatchError::WorkDir`] if the work directory
    /// cannot be created.
    #[instrument(level = "debug", skip(store, fetcher, extractor, options), fields(work_dir = %options.work_dir.display()))]
    pub fn new(
        store: AnalysisStore,
        fetcher: DocumentFetcher,
        extractor: ContentExtractor,
        options: BatchOptions,
    ) -> Result<Self, BatchError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&options.concurrency) {
            return Err(BatchError::InvalidConcurrency {
                value: options.concurrency,
            });
        }

        std::fs::create_dir_all(&options.work_dir).map_err(|source| BatchError::WorkDir {
            path: options.work_dir.clone(),
            source,
        })?;

        debug!(
            concurrency = options.concurrency,
            retained_batches = options.retained_batches,
            fetch_timeout_secs = options.fetch_timeout.as_secs(),
            strategies = ?extractor.strategy_names(),
            "creating batch orchestrator"
        );

        Ok(Self {
            store,
            fetcher,
            extractor,
            scorer: HeuristicScorer::new(),
            semaphore: Arc::new(Semaphore::new(options.concurrency)),
            registry: BatchRegistry::with_retention(options.retained_batches),
            options: Arc::new(options),
        })
    }

    /// Creates an orchestrator with the default fetcher and extractor.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_defaults(store: AnalysisStore, options: BatchOptions) -> Result<Self, BatchError> {
        Self::new(
            store,
            DocumentFetcher::new(),
            ContentExtractor::new(),
            options,
        )
    }

    /// Returns the configured worker count.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.options.concurrency
    }

    #[must_use]
    pub fn store(&self) -> &AnalysisStore {
        &self.store
    }

    /// Starts processing `urls` in the background and returns immediately.
    ///
    /// An empty list yields a batch that completes with zero items.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[instrument(skip(self, urls), fields(total = urls.len()))]
    pub fn submit_batch(&self, urls: Vec<String>) -> BatchHandle {
        let id = BatchId::new();
        let total = urls.len();
        self.registry.register(id, total);
        info!(batch_id = %id, total, "batch submitted");

        let orchestrator = self.clone();
        let task = tokio::spawn(async move { orchestrator.run_batch(id, urls).await });

        BatchHandle {
            id,
            total,
            registry: self.registry.clone(),
            task,
        }
    }

    /// Returns a snapshot of one batch's status.
    #[must_use]
    pub fn status(&self, id: BatchId) -> Option<BatchStatus> {
        self.registry.get(id)
    }

    /// Returns snapshots of every running batch and of the most recently
    /// completed ones.
    #[must_use]
    pub fn list_batches(&self) -> Vec<BatchStatus> {
        self.registry.list()
    }

    /// Drops a completed batch from the registry and returns its status.
    ///
    /// Returns `None` for unknown or still-running batches.
    pub fn forget_batch(&self, id: BatchId) -> Option<BatchStatus> {
        self.registry.forget(id)
    }

    #[instrument(skip(self, id, urls), fields(batch_id = %id))]
    async fn run_batch(self, id: BatchId, urls: Vec<String>) -> Option<BatchStatus> {
        let batch_dir = self.options.work_dir.join(id.to_string());
        let mut handles = Vec::with_capacity(urls.len());

        for (index, url) in urls.into_iter().enumerate() {
            let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
                self.fail(id, &url, FailureStage::Task, "worker pool closed");
                continue;
            };

            let orchestrator = self.clone();
            let item_dir = batch_dir.join(index.to_string());
            let task_url = url.clone();
            handles.push((
                url,
                tokio::spawn(async move {
                    let _permit = permit;
                    orchestrator.process_item(id, &task_url, &item_dir).await;
                }),
            ));
        }

        debug!(task_count = handles.len(), "waiting for items to complete");

        for (url, handle) in handles {
            if let Err(e) = handle.await {
                warn!(url = %url, error = %e, "item task panicked");
                self.fail(id, &url, FailureStage::Task, e.to_string());
            }
        }

        remove_dir(&batch_dir).await;
        let status = self.registry.complete(id);

        if let Some(status) = &status {
            info!(
                total = status.total,
                stored = status.stored,
                degraded = status.degraded,
                failed = status.failures.len(),
                "batch complete"
            );
        }
        status
    }

    #[instrument(skip(self, id, item_dir), fields(batch_id = %id))]
    async fn process_item(&self, id: BatchId, url: &str, item_dir: &Path) {
        if let Err(e) = tokio::fs::create_dir_all(item_dir).await {
            warn!(path = %item_dir.display(), error = %e, "cannot create item work directory");
            self.fail(id, url, FailureStage::Workspace, e.to_string());
            return;
        }

        self.analyze(id, url, item_dir).await;
        remove_dir(item_dir).await;
    }

    async fn analyze(&self, id: BatchId, url: &str, item_dir: &Path) {
        let path = match self
            .fetcher
            .fetch(url, item_dir, self.options.fetch_timeout)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "fetch failed, skipping");
                self.fail(id, url, FailureStage::Fetch, e.to_string());
                return;
            }
        };

        let extracted = self.extractor.extract_text(&path).await;
        let context = DocumentContext::new(Some(url)).with_file_path(&path);
        let profile = self.scorer.score_with_context(&extracted.text, &context);

        match self.store.insert(&profile).await {
            Ok(record_id) => {
                info!(
                    record_id,
                    level = %profile.complexity_level(),
                    degraded = extracted.is_degraded(),
                    "document analyzed"
                );
                self.registry.record_stored(id, extracted.is_degraded());
            }
            Err(e) => {
                error!(
                    error = %e,
                    db_kind = ?e.database_kind(),
                    busy = e.is_busy_or_locked(),
                    "failed to store analysis, result lost"
                );
                self.fail(id, url, FailureStage::Store, e.to_string());
            }
        }
    }

    fn fail(&self, id: BatchId, url: &str, stage: FailureStage, message: impl Into<String>) {
        self.registry.record_failure(
            id,
            ItemFailure {
                url: url.to_string(),
                stage,
                message: message.into(),
            },
        );
    }
}

async fn remove_dir(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!(path = %path.display(), error = %e, "could not remove work directory"),
    }
}
