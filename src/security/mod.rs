//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved route:
//!     → ssrf.rs (proxy targets: scheme + private/reserved host check)
//!     → keys.rs (object keys: strict canonical-form check)
//!     → headers.rs (strip edge-identifying and hop-by-hop headers)
//!     → Pass to dispatch
//! ```
//!
//! # Design Decisions
//! - Validation runs before any network or storage call
//! - Fail closed: reject on any check failure, never silently correct
//! - No trust in stored targets; they are validated per request

pub mod headers;
pub mod keys;
pub mod ssrf;

pub use keys::{validate_object_key, KeyError};
pub use ssrf::{validate_target_url, SsrfGuard, TargetError};
