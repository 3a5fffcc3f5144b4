//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to origin:
//!     → timeouts.rs (enforce the route's deadline)
//!     → On expiry: drop the call, answer 504
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound call has a deadline
//! - No retries: forwarded bodies are streamed and cannot be replayed

pub mod timeouts;

pub use timeouts::{Deadline, DeadlineExceeded};
