//! Terminal spinner that follows a running batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use formscan_core::{BatchId, BatchOrchestrator, BatchStatus};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tracing::debug;

const TICK: Duration = Duration::from_millis(100);
const POLL: Duration = Duration::from_millis(120);

/// Background spinner polling the orchestrator's registry.
///
/// A disabled spinner spawns nothing, so `finish` is a no-op.
pub(crate) struct BatchSpinner {
    task: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl BatchSpinner {
    pub(crate) fn start(enabled: bool, orchestrator: BatchOrchestrator, batch_id: BatchId) -> Self {
        let stop = Arc::new(AtomicBool::new(!enabled));
        let task = enabled.then(|| tokio::spawn(poll(orchestrator, batch_id, Arc::clone(&stop))));
        Self { task, stop }
    }

    /// Signals the spinner to stop and waits for it to clear the line.
    pub(crate) async fn finish(self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(task) = self.task
            && let Err(e) = task.await
        {
            debug!(error = %e, "progress task ended abnormally");
        }
    }
}

async fn poll(orchestrator: BatchOrchestrator, batch_id: BatchId, stop: Arc<AtomicBool>) {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(TICK);

    while !stop.load(Ordering::SeqCst) {
        if let Some(status) = orchestrator.status(batch_id) {
            spinner.set_message(progress_message(&status));
            if status.is_completed() {
                break;
            }
        }
        tokio::time::sleep(POLL).await;
    }

    spinner.finish_and_clear();
}

fn progress_message(status: &BatchStatus) -> String {
    format!(
        "[{}/{}] Analyzing documents ({} stored, {} failed)...",
        status.attempted().min(status.total),
        status.total,
        status.stored,
        status.failures.len()
    )
}
