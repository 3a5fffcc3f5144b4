//! Header filtering for forwarded traffic.
//!
//! # Responsibilities
//! - Strip edge-identifying request headers before they reach an origin
//! - Strip hop-by-hop headers in both directions
//!
//! # Design Decisions
//! - The inbound Host belongs to the edge domain and is never forwarded;
//!   the client derives it from the target unless a route overrides it
//! - Filtering copies into a fresh map; the inbound request is untouched

use axum::http::{header, HeaderMap, HeaderName};

/// Headers added by the edge that reveal client or topology details.
pub const EDGE_HEADERS: &[&str] = &[
    "cf-connecting-ip",
    "cf-ipcountry",
    "cf-ray",
    "cf-visitor",
    "x-forwarded-proto",
    "x-real-ip",
];

/// Connection-scoped headers (RFC 9110 §7.6.1).
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Copy of `headers` safe to send to a third-party origin.
pub fn forwardable_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if name == header::HOST || is_edge_header(name) || is_hop_by_hop(name) {
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}

/// Remove hop-by-hop headers in place.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

fn is_edge_header(name: &HeaderName) -> bool {
    EDGE_HEADERS.contains(&name.as_str())
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}
