//! Usage recording.
//!
//! # Responsibilities
//! - Describe one served request as a `UsageEvent`
//! - Hand events to a pluggable recorder
//!
//! # Design Decisions
//! - Recording runs detached; its outcome never changes a response
//! - The default recorder writes a structured log line under the `usage` target
//! - Outcomes are counted by the dispatcher, not by recorders

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Client details captured from request headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequesterInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
}

/// One resolved request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    pub domain: String,
    /// Stored key path that matched (exact path or wildcard pattern).
    pub route_path: String,
    /// Canonical request path.
    pub request_path: String,
    pub route_type: &'static str,
    /// Redirect/proxy URL or object key of the matched route.
    pub target: String,
    pub status: u16,
    pub timestamp: DateTime<Utc>,
    pub requester: RequesterInfo,
}

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("usage sink unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode usage event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Sink for usage events.
#[async_trait]
pub trait UsageRecorder: Send + Sync {
    async fn record(&self, event: UsageEvent) -> Result<(), UsageError>;
}

/// Writes each event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogUsageRecorder;

#[async_trait]
impl UsageRecorder for LogUsageRecorder {
    async fn record(&self, event: UsageEvent) -> Result<(), UsageError> {
        let requester = serde_json::to_string(&event.requester)?;
        tracing::info!(
            target: "usage",
            domain = %event.domain,
            route_path = %event.route_path,
            request_path = %event.request_path,
            route_type = event.route_type,
            target = %event.target,
            status = event.status,
            timestamp = %event.timestamp.to_rfc3339(),
            requester = %requester,
            "Route served"
        );
        Ok(())
    }
}
