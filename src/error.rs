//! Request-level error taxonomy.
//!
//! Every failure that reaches a caller is rendered as a JSON body with a
//! stable `type` discriminator. Messages are fixed per variant; the text of
//! the underlying error is logged, never returned.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::response::json_error;
use crate::routing::store::StoreError;
use crate::security::keys::KeyError;
use crate::security::ssrf::TargetError;
use crate::storage::object::StorageError;

/// Errors produced while resolving or dispatching a request.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The request carried no usable Host.
    #[error("request has no host")]
    MissingHost,

    /// A redirect or proxy target failed validation.
    #[error("invalid target: {0}")]
    InvalidTarget(#[from] TargetError),

    /// An object-serve target failed key validation.
    #[error("invalid object key: {0}")]
    InvalidKey(#[from] KeyError),

    /// No enabled route matched.
    #[error("no route for {domain}{path}")]
    RouteNotFound { domain: String, path: String },

    /// The route matched but the object is absent from its bucket.
    #[error("object not found: {key}")]
    ObjectNotFound { key: String },

    /// The origin did not answer within the budget.
    #[error("upstream timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    /// Connection-level failure talking to the origin.
    #[error("upstream request failed: {0}")]
    Upstream(#[source] reqwest::Error),

    /// The route names a bucket that has no binding.
    #[error("bucket binding '{0}' is not configured")]
    MissingBucket(String),

    /// The route store failed; distinct from "no route configured".
    #[error("route store failure: {0}")]
    Store(#[from] StoreError),

    /// The object store failed after the object was located.
    #[error("object storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl RouterError {
    /// HTTP status returned to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RouterError::MissingHost | RouterError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            RouterError::InvalidTarget(_) | RouterError::Upstream(_) => StatusCode::BAD_GATEWAY,
            RouterError::RouteNotFound { .. } | RouterError::ObjectNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            RouterError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RouterError::MissingBucket(_) | RouterError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RouterError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable discriminator for programmatic handling.
    pub fn error_type(&self) -> &'static str {
        match self {
            RouterError::MissingHost
            | RouterError::InvalidTarget(_)
            | RouterError::InvalidKey(_) => "validation_error",
            RouterError::RouteNotFound { .. } | RouterError::ObjectNotFound { .. } => "not_found",
            RouterError::Timeout { .. } => "timeout",
            RouterError::Upstream(_) => "network_error",
            RouterError::MissingBucket(_) => "configuration_error",
            RouterError::Store(_) => "store_error",
            RouterError::Storage(_) => "storage_error",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            RouterError::MissingHost => "Bad Request",
            RouterError::InvalidTarget(_) => "Invalid target",
            RouterError::InvalidKey(_) => "Invalid object key",
            RouterError::RouteNotFound { .. } => "Not Found",
            RouterError::ObjectNotFound { .. } => "Object not found",
            RouterError::Timeout { .. } => "Gateway Timeout",
            RouterError::Upstream(_) => "Bad Gateway",
            RouterError::MissingBucket(_) => "Storage not configured",
            RouterError::Store(_) => "Service Unavailable",
            RouterError::Storage(_) => "Internal Server Error",
        }
    }

    /// Caller-safe message. Validation reasons are ours and safe to show.
    fn public_message(&self) -> String {
        match self {
            RouterError::MissingHost => "Request is missing a Host header".to_string(),
            RouterError::InvalidTarget(e) => e.to_string(),
            RouterError::InvalidKey(e) => e.to_string(),
            RouterError::RouteNotFound { .. } => "No route is configured for this path".to_string(),
            RouterError::ObjectNotFound { .. } => "The requested object does not exist".to_string(),
            RouterError::Timeout { timeout } => format!(
                "Upstream server did not respond within {}ms",
                timeout.as_millis()
            ),
            RouterError::Upstream(_) => "Failed to reach upstream server".to_string(),
            RouterError::MissingBucket(_) => "Storage bucket binding is missing".to_string(),
            RouterError::Store(_) => "Route lookup is temporarily unavailable".to_string(),
            RouterError::Storage(_) => "Failed to read object".to_string(),
        }
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let key = match &self {
            RouterError::ObjectNotFound { key } => Some(key.as_str()),
            _ => None,
        };
        json_error(
            self.status_code(),
            self.title(),
            &self.public_message(),
            self.error_type(),
            key,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: RouterError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn timeout_renders_504_with_type() {
        let (status, body) = body_json(RouterError::Timeout {
            timeout: Duration::from_secs(30),
        })
        .await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["type"], "timeout");
        assert!(body["message"].as_str().unwrap().contains("30000ms"));
    }

    #[tokio::test]
    async fn object_not_found_carries_key() {
        let (status, body) = body_json(RouterError::ObjectNotFound {
            key: "media/file.zip".into(),
        })
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["key"], "media/file.zip");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn store_failure_is_not_a_404() {
        let (status, body) =
            body_json(RouterError::Store(StoreError::Unavailable("kv down".into()))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["type"], "store_error");
        // Internal text stays in the logs.
        assert!(!body.to_string().contains("kv down"));
    }

    #[tokio::test]
    async fn invalid_target_is_a_validation_error() {
        let (status, body) =
            body_json(RouterError::InvalidTarget(TargetError::Scheme("ftp".into()))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["type"], "validation_error");
    }
}
