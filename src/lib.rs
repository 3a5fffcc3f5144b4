//! Edge request router: link redirector, reverse proxy and object server.
//!
//! Each request is resolved against per-domain routes (exact path first, then
//! wildcard patterns from most to least specific) and dispatched to one of
//! three handlers. Usage is recorded off the response path.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod storage;

pub use config::schema::RouterConfig;
pub use dispatch::Dispatcher;
pub use error::RouterError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
