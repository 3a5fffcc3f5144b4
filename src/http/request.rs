//! Request inspection helpers.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Extract the served domain from Host or the URI authority
//! - Capture requester details for usage events
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Edge headers are trusted for requester details only, never for routing

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::observability::usage::RequesterInfo;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a UUID v4 for requests that arrive without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeRequestId;

impl MakeRequestId for EdgeRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(id))
    }
}

/// Domain the request is addressed to, lowercased and without a port.
pub fn request_domain<B>(request: &Request<B>) -> Option<String> {
    let authority = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))?;

    let host = strip_port(authority.trim());
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

fn strip_port(authority: &str) -> &str {
    if let Some(rest) = authority.strip_prefix('[') {
        // Bracketed IPv6 literal.
        return rest.split(']').next().unwrap_or(rest);
    }
    authority.split(':').next().unwrap_or(authority)
}

/// Requester details from edge headers, falling back to the peer address.
pub fn requester_info<B>(request: &Request<B>) -> RequesterInfo {
    let headers = request.headers();
    let ip = header_str(headers, "cf-connecting-ip")
        .or_else(|| header_str(headers, "x-real-ip"))
        .or_else(|| {
            header_str(headers, "x-forwarded-for")
                .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        })
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

    RequesterInfo {
        ip,
        country: header_str(headers, "cf-ipcountry"),
        user_agent: header_str(headers, header::USER_AGENT.as_str()),
        referer: header_str(headers, header::REFERER.as_str()),
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
