use costar_core::CostarResult;
use std::future::Future;
use tokio_util::task::TaskTracker;

/// Runs units of work on their own tasks, detached from whoever spawned them.
///
/// The spawner never sees the outcome. Failures go to the log and nowhere
/// else. [`DetachedWork::wait_idle`] lets shutdown (and tests) wait for the
/// work that is still running.
#[derive(Clone, Default)]
pub struct DetachedWork {
    tracker: TaskTracker,
}

impl DetachedWork {
    /// Create a tracker with nothing in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `work` in the background. Must be called inside a Tokio runtime.
    pub fn spawn<F>(&self, label: &'static str, work: F)
    where
        F: Future<Output = CostarResult<()>> + Send + 'static,
    {
        self.tracker.spawn(async move {
            if let Err(e) = work.await {
                tracing::warn!(task = label, error = %e, "Detached work failed");
            }
        });
    }

    /// Units of work started but not yet finished. Work that panicked counts
    /// as finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Resolve once nothing is in flight.
    ///
    /// Work spawned while waiting is waited for too.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
