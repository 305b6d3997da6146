//! Work that must outlive the response it was started for.

use std::future::Future;

use tokio_util::task::TaskTracker;

/// Keeps the worker alive until detached work (cache writes, pre-caching)
/// has settled.
///
/// Responses are handed back without waiting for their cache writes; the
/// writes are registered here instead so a host can drain them before
/// shutting down.
#[derive(Debug, Clone, Default)]
pub struct Lifetime {
    tracker: TaskTracker,
}

impl Lifetime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut` detached from the caller but tracked by this lifetime.
    pub fn wait_until<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(fut);
    }

    /// Number of tracked tasks still running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task registered so far has finished.
    ///
    /// The tracker is reopened afterwards, so the lifetime stays usable.
    pub async fn settled(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
