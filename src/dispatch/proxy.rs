//! Reverse proxy handler.
//!
//! # Responsibilities
//! - Validate the target before any network call
//! - Map the request onto the target URL
//! - Forward method, filtered headers and streamed body under a deadline
//! - Stream the origin response back with its hop-by-hop headers removed
//!
//! # Design Decisions
//! - Origin redirects are returned to the client, never followed
//! - The deadline covers the wait for response headers; dropping the
//!   outbound future on expiry closes the origin connection
//! - No retries: the request body is streamed once

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, Method, Request};
use axum::response::Response;
use reqwest::redirect::Policy;
use url::Url;

use crate::config::schema::ProxyConfig;
use crate::dispatch::redirect::join_path;
use crate::error::RouterError;
use crate::observability::metrics;
use crate::resilience::Deadline;
use crate::routing::{ProxyOptions, ResolvedRoute};
use crate::security::headers::{forwardable_request_headers, strip_hop_by_hop};
use crate::security::{SsrfGuard, TargetError};

/// Header stamped on every proxied response.
pub const X_PROXIED_BY: HeaderName = HeaderName::from_static("x-proxied-by");
const PROXIED_BY_VALUE: &str = "edge-router";

/// Forwards requests to validated origins.
#[derive(Clone)]
pub struct ProxyHandler {
    client: reqwest::Client,
    guard: SsrfGuard,
    deadline: Deadline,
}

impl ProxyHandler {
    pub fn new(guard: SsrfGuard, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()?;
        Ok(Self {
            client,
            guard,
            deadline: Deadline::new(timeout),
        })
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let guard = if config.allow_private_targets {
            SsrfGuard::allowing_private_targets()
        } else {
            SsrfGuard::strict()
        };
        Self::new(guard, config.timeout())
    }

    /// Replace the default upstream timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Deadline::new(timeout);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.deadline.budget()
    }

    /// Forward `request` to the route's origin.
    pub async fn handle(
        &self,
        route: &ResolvedRoute,
        opts: &ProxyOptions,
        request: Request<Body>,
    ) -> Result<Response, RouterError> {
        let target = self.guard.validate(&route.record.target)?;
        let url = build_target_url(target, route, request.uri().query());

        let (parts, body) = request.into_parts();
        let mut headers = forwardable_request_headers(&parts.headers);
        if let Some(host) = &opts.host_header {
            let value = HeaderValue::from_str(host)
                .map_err(|_| TargetError::HostHeader(host.clone()))?;
            headers.insert(header::HOST, value);
        }

        let mut outbound = self
            .client
            .request(parts.method.clone(), url.clone())
            .headers(headers);
        if parts.method != Method::GET && parts.method != Method::HEAD {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let deadline = self.deadline.or_override_ms(opts.timeout_ms);
        let timeout_ms = deadline.budget().as_millis() as u64;

        tracing::debug!(
            path = %route.request_path,
            target = %url,
            method = %parts.method,
            "Forwarding request"
        );

        let upstream = match deadline.run(outbound.send()).await {
            Ok(Ok(upstream)) => upstream,
            Ok(Err(e)) if e.is_timeout() => {
                return Err(self.timed_out(route, &url, deadline));
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    path = %route.request_path,
                    target = %url,
                    timeout_ms,
                    error = %e,
                    "Upstream request failed"
                );
                metrics::record_upstream_failure("network");
                return Err(RouterError::Upstream(e));
            }
            Err(_) => return Err(self.timed_out(route, &url, deadline)),
        };

        Ok(into_response(upstream, opts))
    }

    fn timed_out(&self, route: &ResolvedRoute, url: &Url, deadline: Deadline) -> RouterError {
        tracing::warn!(
            path = %route.request_path,
            target = %url,
            timeout_ms = deadline.budget().as_millis() as u64,
            "Upstream request timed out"
        );
        metrics::record_upstream_failure("timeout");
        RouterError::Timeout {
            timeout: deadline.budget(),
        }
    }
}

/// Map the request onto the target: wildcard remainder appended to the
/// target path, incoming query replacing the target's.
pub fn build_target_url(mut target: Url, route: &ResolvedRoute, query: Option<&str>) -> Url {
    if route.is_wildcard() {
        let joined = join_path(target.path(), route.wildcard_remainder());
        target.set_path(&joined);
    }
    target.set_query(query.filter(|q| !q.is_empty()));
    target
}

fn into_response(upstream: reqwest::Response, opts: &ProxyOptions) -> Response {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);

    if let Some(cache_control) = &opts.cache_control {
        match HeaderValue::from_str(cache_control) {
            Ok(value) => {
                headers.insert(header::CACHE_CONTROL, value);
            }
            Err(_) => {
                tracing::warn!(cache_control = %cache_control, "Ignoring invalid Cache-Control override");
            }
        }
    }
    headers.insert(X_PROXIED_BY, HeaderValue::from_static(PROXIED_BY_VALUE));

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
