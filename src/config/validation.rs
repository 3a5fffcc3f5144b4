//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (seed routes reference served domains and
//!   configured buckets)
//! - Detect duplicate route keys
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::routing::{normalize, RouteKind};

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("no domains configured")]
    NoDomains,

    #[error("domain '{0}' must be a lowercase host name without a port")]
    Domain(String),

    #[error("route {index} references domain '{domain}' which is not served")]
    UnknownDomain { index: usize, domain: String },

    #[error("route {index} path '{path}' is not canonical")]
    NonCanonicalPath { index: usize, path: String },

    #[error("route {index} duplicates {domain}:{path}")]
    DuplicateRoute {
        index: usize,
        domain: String,
        path: String,
    },

    #[error("route {index} references bucket '{bucket}' which is not configured")]
    UnknownBucket { index: usize, bucket: String },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("proxy.timeout_secs ({timeout_secs}) must be below timeouts.request_secs ({request_secs})")]
    ProxyTimeoutTooLong { timeout_secs: u64, request_secs: u64 },

    #[error("route {index} timeoutMs ({timeout_ms}) must be below timeouts.request_secs ({limit_ms}ms)")]
    RouteTimeoutTooLong {
        index: usize,
        timeout_ms: u64,
        limit_ms: u64,
    },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.proxy.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("proxy.timeout_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }
    // The shell timeout answers 408 on expiry, so upstream budgets must end first.
    let request_limit_ms = config.timeouts.request_secs.saturating_mul(1000);
    if config.timeouts.request_secs > 0 && config.proxy.timeout_secs >= config.timeouts.request_secs {
        errors.push(ValidationError::ProxyTimeoutTooLong {
            timeout_secs: config.proxy.timeout_secs,
            request_secs: config.timeouts.request_secs,
        });
    }

    if config.domains.is_empty() {
        errors.push(ValidationError::NoDomains);
    }
    for domain in &config.domains {
        if !is_valid_domain(domain) {
            errors.push(ValidationError::Domain(domain.clone()));
        }
    }

    let served: HashSet<&str> = config.domains.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    for (index, seed) in config.routes.iter().enumerate() {
        let path = &seed.record.path;

        if !served.contains(seed.domain.as_str()) {
            errors.push(ValidationError::UnknownDomain {
                index,
                domain: seed.domain.clone(),
            });
        }
        if !is_canonical_route_path(path) {
            errors.push(ValidationError::NonCanonicalPath {
                index,
                path: path.clone(),
            });
        }
        if !seen.insert((seed.domain.as_str(), path.as_str())) {
            errors.push(ValidationError::DuplicateRoute {
                index,
                domain: seed.domain.clone(),
                path: path.clone(),
            });
        }
        if let RouteKind::Proxy(opts) = &seed.record.kind {
            let timeout_ms = opts.timeout_ms.unwrap_or(0);
            if request_limit_ms > 0 && timeout_ms >= request_limit_ms {
                errors.push(ValidationError::RouteTimeoutTooLong {
                    index,
                    timeout_ms,
                    limit_ms: request_limit_ms,
                });
            }
        }
        if let RouteKind::ObjectServe(opts) = &seed.record.kind {
            let bucket = opts
                .bucket
                .as_deref()
                .unwrap_or(&config.objects.default_bucket);
            if !config.buckets.contains(bucket) {
                errors.push(ValidationError::UnknownBucket {
                    index,
                    bucket: bucket.to_string(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain.len() <= 253
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        })
}

/// A stored path is canonical when normalizing it is a no-op. Wildcard
/// patterns are checked on their prefix.
fn is_canonical_route_path(path: &str) -> bool {
    if path == "/*" {
        return true;
    }
    let prefix = path.strip_suffix("/*").unwrap_or(path);
    !prefix.contains('*') && normalize(prefix) == prefix
}
