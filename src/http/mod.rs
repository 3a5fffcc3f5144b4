//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → request.rs (domain and requester extraction)
//!     → [dispatcher resolves and handles the route]
//!     → response.rs (JSON error bodies)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_domain, requester_info, EdgeRequestId, X_REQUEST_ID};
pub use response::json_error;
pub use server::{AppState, HttpServer};
