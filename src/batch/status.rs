//! Observable batch lifecycle records.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Identifier of one submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BatchId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    /// Items are still being processed.
    Running,
    /// Every URL has been attempted exactly once.
    Completed,
}

/// Pipeline stage where an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Private work directory could not be created.
    Workspace,
    /// The document could not be retrieved.
    Fetch,
    /// The profile could not be persisted.
    Store,
    /// The worker task panicked or could not be scheduled.
    Task,
}

impl FailureStage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Fetch => "fetch",
            Self::Store => "store",
            Self::Task => "task",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One URL that did not produce a stored profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub url: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Snapshot of a batch's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchStatus {
    pub id: BatchId,
    pub state: BatchState,
    /// Number of URLs submitted.
    pub total: usize,
    /// Profiles persisted so far.
    pub stored: usize,
    /// Stored profiles scored from placeholder text.
    pub degraded: usize,
    pub failures: Vec<ItemFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchStatus {
    pub(crate) fn new(id: BatchId, total: usize) -> Self {
        Self {
            id,
            state: BatchState::Running,
            total,
            stored: 0,
            degraded: 0,
            failures: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// URLs finished so far, successfully or not.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.stored + self.failures.len()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == BatchState::Completed
    }
}

/// Completed batches kept by a default registry.
pub const DEFAULT_RETAINED_BATCHES: usize = 256;

/// In-memory registry of batch statuses, shared between the orchestrator
/// and its workers.
///
/// Running batches are always kept. Once more than `retained` batches have
/// completed, the ones that finished earliest are dropped.
#[derive(Debug, Clone)]
pub struct BatchRegistry {
    batches: Arc<DashMap<BatchId, BatchStatus>>,
    retained: usize,
}

impl Default for BatchRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETAINED_BATCHES)
    }
}

impl BatchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that keeps at most `retained` completed batches.
    ///
    /// A value of 0 is treated as 1.
    #[must_use]
    pub fn with_retention(retained: usize) -> Self {
        Self {
            batches: Arc::new(DashMap::new()),
            retained: retained.max(1),
        }
    }

    pub(crate) fn register(&self, id: BatchId, total: usize) {
        self.batches.insert(id, BatchStatus::new(id, total));
    }

    pub(crate) fn record_stored(&self, id: BatchId, degraded: bool) {
        if let Some(mut status) = self.batches.get_mut(&id) {
            status.stored += 1;
            if degraded {
                status.degraded += 1;
            }
        }
    }

    pub(crate) fn record_failure(&self, id: BatchId, failure: ItemFailure) {
        if let Some(mut status) = self.batches.get_mut(&id) {
            status.failures.push(failure);
        }
    }

    /// Marks a batch completed and returns its final snapshot.
    pub(crate) fn complete(&self, id: BatchId) -> Option<BatchStatus> {
        let snapshot = self.batches.get_mut(&id).map(|mut status| {
            status.state = BatchState::Completed;
            status.finished_at = Some(Utc::now());
            status.value().clone()
        });
        self.prune();
        snapshot
    }

    /// Drops the oldest completed batches beyond the retention limit.
    fn prune(&self) {
        let mut completed: Vec<(DateTime<Utc>, BatchId)> = self
            .batches
            .iter()
            .filter_map(|entry| entry.value().finished_at.map(|at| (at, *entry.key())))
            .collect();
        if completed.len() <= self.retained {
            return;
        }

        completed.sort_unstable_by_key(|(finished_at, _)| *finished_at);
        let excess = completed.len() - self.retained;
        for (_, id) in completed.into_iter().take(excess) {
            self.batches.remove(&id);
        }
        debug!(pruned = excess, "forgot completed batches");
    }

    /// Removes a completed batch and returns its last snapshot.
    ///
    /// Running batches are left untouched and yield `None`.
    pub fn forget(&self, id: BatchId) -> Option<BatchStatus> {
        self.batches
            .remove_if(&id, |_, status| status.is_completed())
            .map(|(_, status)| status)
    }

    /// Returns a snapshot of one batch.
    #[must_use]
    pub fn get(&self, id: BatchId) -> Option<BatchStatus> {
        self.batches.get(&id).map(|entry| entry.value().clone())
    }

    /// Returns snapshots of every known batch, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<BatchStatus> {
        let mut all: Vec<BatchStatus> = self
            .batches
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|status| status.started_at);
        all
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn failure(url: &str, stage: FailureStage) -> ItemFailure {
        ItemFailure {
            url: url.to_string(),
            stage,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_batch_id_parse_round_trip() {
        let id = BatchId::new();
        let parsed: BatchId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<BatchId>().is_err());
    }

    #[test]
    fn test_registry_tracks_progress() {
        let registry = BatchRegistry::new();
        let id = BatchId::new();
        registry.register(id, 3);

        registry.record_stored(id, false);
        registry.record_stored(id, true);
        registry.record_failure(id, failure("https://a.example/x.pdf", FailureStage::Fetch));

        let status = registry.get(id).unwrap();
        assert_eq!(status.state, BatchState::Running);
        assert_eq!(status.stored, 2);
        assert_eq!(status.degraded, 1);
        assert_eq!(status.attempted(), 3);
        assert!(status.finished_at.is_none());

        let snapshot = registry.complete(id).unwrap();
        let status = registry.get(id).unwrap();
        assert_eq!(snapshot, status);
        assert!(status.is_completed());
        assert!(status.finished_at.unwrap() >= status.started_at);
    }

    #[test]
    fn test_registry_ignores_unknown_batch() {
        let registry = BatchRegistry::new();
        let id = BatchId::new();
        registry.record_stored(id, false);
        assert!(registry.complete(id).is_none());
        assert!(registry.forget(id).is_none());
        assert!(registry.get(id).is_none());
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_failure_stage_serializes_snake_case() {
        let json = serde_json::to_value(failure("u", FailureStage::Workspace)).unwrap();
        assert_eq!(json["stage"], "workspace");
        assert_eq!(FailureStage::Store.to_string(), "store");
    }

    #[test]
    fn test_registry_shared_between_clones() {
        let registry = BatchRegistry::new();
        let clone = registry.clone();
        let id = BatchId::new();
        registry.register(id, 1);
        clone.record_stored(id, false);
        assert_eq!(registry.get(id).unwrap().stored, 1);
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn test_registry_keeps_only_newest_completed_batches() {
        let registry = BatchRegistry::with_retention(2);
        let ids: Vec<BatchId> = (0..4).map(|_| BatchId::new()).collect();
        for &id in &ids {
            registry.register(id, 1);
            registry.record_failure(id, failure("https://a.example/x.pdf", FailureStage::Fetch));
            registry.complete(id);
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let kept: Vec<BatchId> = registry.list().iter().map(|s| s.id).collect();
        assert_eq!(kept, vec![ids[2], ids[3]]);
        assert!(registry.get(ids[0]).is_none());
    }

    #[test]
    fn test_registry_never_prunes_running_batches() {
        let registry = BatchRegistry::with_retention(1);
        let running = BatchId::new();
        registry.register(running, 5);

        for _ in 0..3 {
            let id = BatchId::new();
            registry.register(id, 0);
            registry.complete(id);
        }

        assert_eq!(registry.list().len(), 2);
        let status = registry.get(running).unwrap();
        assert_eq!(status.state, BatchState::Running);
    }

    #[test]
    fn test_zero_retention_keeps_latest_batch() {
        let registry = BatchRegistry::with_retention(0);
        let older = BatchId::new();
        registry.register(older, 0);
        registry.complete(older);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let latest = BatchId::new();
        registry.register(latest, 0);
        let snapshot = registry.complete(latest).unwrap();

        assert!(snapshot.is_completed());
        assert!(registry.get(older).is_none());
        assert_eq!(registry.get(latest), Some(snapshot));
    }

    #[test]
    fn test_forget_removes_only_completed_batches() {
        let registry = BatchRegistry::new();
        let id = BatchId::new();
        registry.register(id, 1);

        assert!(registry.forget(id).is_none());
        assert!(registry.get(id).is_some());

        registry.record_stored(id, false);
        registry.complete(id);
        let forgotten = registry.forget(id).unwrap();
        assert_eq!(forgotten.stored, 1);
        assert!(registry.get(id).is_none());
        assert!(registry.list().is_empty());
    }
}
