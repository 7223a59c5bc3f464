//! Supervised fire-and-forget task pool
//!
//! Background work that outlives a request (update checks, async research)
//! runs under a supervisor: every task carries its own deadline, failures
//! are logged rather than propagated, and shutdown cancels everything.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Supervisor for background tasks
pub struct Supervisor {
    tasks: Mutex<JoinSet<()>>,
    cancel: CancellationToken,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    /// Create an empty supervisor
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(JoinSet::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn a background task with a deadline
    ///
    /// The task is abandoned (not polled further) when the deadline elapses
    /// or the supervisor shuts down.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::unwrap_used)] // Lock poisoning means a task panicked while spawning
    pub fn spawn<F>(&self, name: &'static str, deadline: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            tracing::debug!(task = name, "supervisor shut down, dropping task");
            return;
        }

        let cancel = self.cancel.clone();
        let mut tasks = self.tasks.lock().unwrap();

        // Reap finished tasks so the set does not grow unbounded
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!(task = name, "background task cancelled on shutdown");
                }
                outcome = tokio::time::timeout(deadline, task) => {
                    if outcome.is_err() {
                        tracing::warn!(task = name, ?deadline, "background task hit its deadline");
                    }
                }
            }
        });
    }

    /// Cancel all running tasks and wait for them to wind down
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::unwrap_used)]
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap());
        while tasks.join_next().await.is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_tasks_run_to_completion() {
        let supervisor = Supervisor::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            supervisor.spawn("count", Duration::from_secs(5), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        supervisor.shutdown().await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_work() {
        let supervisor = Supervisor::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let slow_counter = Arc::clone(&counter);
        supervisor.spawn("slow", Duration::from_secs(60), async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            slow_counter.fetch_add(1, Ordering::SeqCst);
        });

        supervisor.shutdown().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0, "cancelled before completing");

        // Spawning after shutdown is a no-op
        let late_counter = Arc::clone(&counter);
        supervisor.spawn("late", Duration::from_secs(1), async move {
            late_counter.fetch_add(1, Ordering::SeqCst);
        });
        supervisor.shutdown().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
