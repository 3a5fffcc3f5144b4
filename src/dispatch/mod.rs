//! Request orchestration.
//!
//! # Data Flow
//! ```text
//! Request
//!     → http::request (domain, requester)
//!     → routing::RouteResolver (ResolvedRoute | NoMatch | store error)
//!     → redirect.rs | proxy.rs | object.rs (one match on the route type)
//!     → usage recorder (detached)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - Every failure becomes a `RouterError` rendered as JSON here, in one place
//! - Usage is recorded for every resolved route, whatever the outcome
//! - Recording never delays or alters the response

pub mod object;
pub mod proxy;
pub mod redirect;

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::error::RouterError;
use crate::http::request::{request_domain, requester_info};
use crate::lifecycle::DetachedTasks;
use crate::observability::metrics;
use crate::observability::usage::{RequesterInfo, UsageEvent, UsageRecorder};
use crate::routing::{ResolvedRoute, RouteKind, RouteResolver};

pub use object::ObjectHandler;
pub use proxy::ProxyHandler;

/// Resolves each request and hands it to the matching handler.
#[derive(Clone)]
pub struct Dispatcher {
    resolver: RouteResolver,
    proxy: ProxyHandler,
    objects: ObjectHandler,
    recorder: Arc<dyn UsageRecorder>,
    tasks: DetachedTasks,
}

impl Dispatcher {
    pub fn new(
        resolver: RouteResolver,
        proxy: ProxyHandler,
        objects: ObjectHandler,
        recorder: Arc<dyn UsageRecorder>,
        tasks: DetachedTasks,
    ) -> Self {
        Self {
            resolver,
            proxy,
            objects,
            recorder,
            tasks,
        }
    }

    /// Background work started on behalf of requests.
    pub fn tasks(&self) -> &DetachedTasks {
        &self.tasks
    }

    pub fn resolver(&self) -> &RouteResolver {
        &self.resolver
    }

    /// Handle one request end to end. Never fails; errors become responses.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let start = Instant::now();

        let Some(domain) = request_domain(&request) else {
            tracing::debug!("Request without a Host");
            metrics::record_request("none", 400, start);
            return RouterError::MissingHost.into_response();
        };
        let raw_path = request.uri().path().to_string();

        let route = match self.resolver.resolve(&domain, &raw_path).await {
            Ok(Some(route)) => route,
            Ok(None) => {
                tracing::debug!(domain = %domain, path = %raw_path, "No route matched");
                metrics::record_request("none", 404, start);
                return RouterError::RouteNotFound {
                    domain,
                    path: raw_path,
                }
                .into_response();
            }
            Err(e) => {
                tracing::error!(domain = %domain, path = %raw_path, error = %e, "Route lookup failed");
                metrics::record_request("none", 503, start);
                return RouterError::Store(e).into_response();
            }
        };

        let requester = requester_info(&request);
        let route_type = route.record.kind.type_name();

        let result = match &route.record.kind {
            RouteKind::Redirect(opts) => redirect::handle(&route, opts, request.uri().query()),
            RouteKind::Proxy(opts) => self.proxy.handle(&route, opts, request).await,
            RouteKind::ObjectServe(opts) => {
                let (parts, _body) = request.into_parts();
                self.objects.handle(&route, opts, &domain, &parts).await
            }
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                if e.status_code().is_server_error() {
                    tracing::warn!(
                        domain = %domain,
                        route = %route.key,
                        route_type,
                        error = %e,
                        "Dispatch failed"
                    );
                } else {
                    tracing::debug!(
                        domain = %domain,
                        route = %route.key,
                        route_type,
                        error = %e,
                        "Request rejected"
                    );
                }
                e.into_response()
            }
        };

        let status = response.status().as_u16();
        metrics::record_request(route_type, status, start);
        self.record_usage(domain, &route, status, requester);
        response
    }

    fn record_usage(
        &self,
        domain: String,
        route: &ResolvedRoute,
        status: u16,
        requester: RequesterInfo,
    ) {
        let event = UsageEvent {
            domain,
            route_path: route.key.path().to_string(),
            request_path: route.request_path.clone(),
            route_type: route.record.kind.type_name(),
            target: route.record.target.clone(),
            status,
            timestamp: Utc::now(),
            requester,
        };
        let recorder = self.recorder.clone();
        self.tasks.spawn("usage", async move {
            let result = recorder.record(event).await;
            metrics::record_usage_event(if result.is_ok() { "recorded" } else { "failed" });
            result
        });
    }
}
