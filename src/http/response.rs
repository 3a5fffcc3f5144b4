//! Response helpers.
//!
//! # Responsibilities
//! - Render structured JSON error bodies
//!
//! # Design Decisions
//! - Error bodies always carry `error`, `message` and `type`
//! - Upstream bodies are streamed, never buffered here

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<&'a str>,
}

/// Build a JSON error response.
pub fn json_error(
    status: StatusCode,
    error: &str,
    message: &str,
    kind: &str,
    key: Option<&str>,
) -> Response {
    let mut response = (
        status,
        Json(ErrorBody {
            error,
            message,
            kind,
            key,
        }),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
