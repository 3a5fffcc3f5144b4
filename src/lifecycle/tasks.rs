//! Detached background work.
//!
//! # Responsibilities
//! - Spawn work whose outcome does not affect the response
//! - Log and count failures of that work
//! - Let shutdown wait for in-flight work, bounded by a grace period
//!
//! # Design Decisions
//! - Tasks are plain `tokio::spawn`; tracking is one atomic counter
//! - Panics are caught by the runtime and reported like errors

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time;

use crate::observability::metrics;

#[derive(Default)]
struct Tracker {
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when the task ends, however it ends.
struct InFlight(Arc<Tracker>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Handle for submitting detached tasks.
#[derive(Clone, Default)]
pub struct DetachedTasks {
    tracker: Arc<Tracker>,
}

impl DetachedTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut` in the background. An `Err` is logged under `name`.
    pub fn spawn<F, E>(&self, name: &'static str, fut: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.tracker.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlight(self.tracker.clone());

        let handle = tokio::spawn(async move {
            let _guard = guard;
            fut.await
        });

        tokio::spawn(async move {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(task = name, error = %e, "Background task failed");
                    metrics::record_background_failure(name);
                }
                Err(e) => {
                    tracing::error!(task = name, error = %e, "Background task panicked");
                    metrics::record_background_failure(name);
                }
            }
        });
    }

    /// Number of tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight.load(Ordering::Acquire)
    }

    /// Wait until no tasks are running or `grace` elapses.
    ///
    /// Returns `true` when everything finished in time.
    pub async fn drain(&self, grace: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.tracker.idle.notified();
                if self.in_flight() == 0 {
                    return;
                }
                notified.await;
            }
        };

        match time::timeout(grace, wait).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    remaining = self.in_flight(),
                    grace_secs = grace.as_secs(),
                    "Background tasks still running after grace period"
                );
                false
            }
        }
    }
}
