//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher and handlers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → usage.rs (one usage event per resolved request)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Usage sink (pluggable recorder)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through the tracing span of each request
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
pub mod usage;

pub use usage::{LogUsageRecorder, RequesterInfo, UsageError, UsageEvent, UsageRecorder};
