//! Fire-and-forget tasks that still finish before the process exits.
//!
//! Every task spawned through [`BackgroundTasks`] is counted while it runs.
//! Panics are caught and logged instead of being lost with the task, and
//! [`BackgroundTasks::drain`] lets shutdown wait for the count to reach zero.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use tracing::{Instrument, error, info_span};

#[derive(Clone, Debug, Default)]
pub struct BackgroundTasks {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    in_flight: AtomicUsize,
    idle: Notify,
}

struct InFlight(Arc<Inner>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` on the runtime without waiting for it.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(self.inner.clone());
        let span = info_span!("background", task = name);

        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = tokio::spawn(task.instrument(span)).await {
                if e.is_panic() {
                    error!(task = name, "Background task panicked");
                } else {
                    error!(task = name, error = %e, "Background task cancelled");
                }
            }
        });
    }

    /// Number of tasks still running.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Resolves once no task is running.
    pub async fn drain(&self) {
        loop {
            let idle = self.inner.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }

            idle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[tokio::test]
    async fn test_drain_waits_for_tasks() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicBool::new(false));

        let flag = done.clone();
        tasks.spawn("slow", async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(tasks.in_flight(), 1);

        tasks.drain().await;

        assert!(done.load(Ordering::SeqCst));
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_drain_with_no_tasks_returns() {
        BackgroundTasks::new().drain().await;
    }

    #[tokio::test]
    async fn test_panicking_task_is_released() {
        let tasks = BackgroundTasks::new();

        tasks.spawn("panics", async {
            panic!("boom");
        });

        tokio::time::timeout(Duration::from_secs(1), tasks.drain())
            .await
            .unwrap();
        assert_eq!(tasks.in_flight(), 0);
    }
}
