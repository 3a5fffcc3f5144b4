//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Seed routes, bind buckets → Build dispatcher
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Drain tasks → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! Tasks (tasks.rs):
//!     Cache writes, usage events → detached, drained on shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: background work gets a bounded grace period

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod tasks;

pub use shutdown::Shutdown;
pub use startup::{build_dispatcher, StartupError};
pub use tasks::DetachedTasks;
