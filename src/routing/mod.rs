//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (domain, raw path)
//!     → normalize.rs (canonical path)
//!     → resolver.rs (exact key, then wildcard candidates)
//!     → store.rs (point-get per candidate, sequential)
//!     → Return: ResolvedRoute or NoMatch
//! ```
//!
//! # Design Decisions
//! - Exact match beats any wildcard; longer wildcard prefixes beat shorter
//! - Disabled records behave as if absent
//! - Store failures are errors, never a silent NoMatch
//! - Records are read-only here; the CRUD layer owns writes

pub mod normalize;
pub mod record;
pub mod resolver;
pub mod store;

pub use normalize::normalize;
pub use record::{ObjectOptions, ProxyOptions, RedirectOptions, RouteKind, RouteRecord};
pub use resolver::{wildcard_candidates, ResolvedRoute, RouteResolver};
pub use store::{InMemoryRouteStore, RouteKey, RouteStore, StoreError};
