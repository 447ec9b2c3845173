//! Cancellable background work.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// At most one pending task; scheduling a new one aborts the previous.
///
/// Dropping the slot aborts its task. Must be used within a Tokio runtime.
#[derive(Debug, Default)]
pub struct ScheduledTask {
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// An empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` after `delay`, replacing any pending task.
    pub fn schedule<F>(&mut self, delay: Duration, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
        }));
    }

    /// Run `work` now, replacing any pending task.
    pub fn spawn<F>(&mut self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(work));
    }

    /// Abort the pending task. Returns whether one was still running.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.abort();
                running
            }
            None => false,
        }
    }

    /// Whether a task is scheduled and has not finished.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Monotonic counter tagging async work so stale results can be dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Generation(u64);

impl Generation {
    /// Invalidate everything issued so far and return the new generation.
    pub fn advance(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    /// The current generation.
    #[must_use]
    pub fn current(self) -> u64 {
        self.0
    }

    /// Whether `tag` is still current.
    #[must_use]
    pub fn is_current(self, tag: u64) -> bool {
        self.0 == tag
    }
}
