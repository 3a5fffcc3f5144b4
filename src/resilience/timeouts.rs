//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls with a deadline
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the wrapped future is dropped on
//!   expiry, which closes its connection
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time;

/// The deadline elapsed before the operation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation exceeded its {}ms deadline", .0.as_millis())]
pub struct DeadlineExceeded(pub Duration);

/// A time budget for one upstream operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    budget: Duration,
}

impl Deadline {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    /// Per-call override in milliseconds, else this deadline.
    pub fn or_override_ms(self, override_ms: Option<u64>) -> Self {
        match override_ms {
            Some(ms) if ms > 0 => Self::new(Duration::from_millis(ms)),
            _ => self,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Run `fut`, dropping it if the budget runs out.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, DeadlineExceeded> {
        time::timeout(self.budget, fut)
            .await
            .map_err(|_| DeadlineExceeded(self.budget))
    }
}
