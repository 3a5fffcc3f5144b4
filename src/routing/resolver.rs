//! Route lookup with wildcard fallback.
//!
//! # Responsibilities
//! - Normalize the request path
//! - Probe the exact key, then wildcard candidates most-specific first
//! - Return the matched route or an explicit no-match
//!
//! # Design Decisions
//! - Probes are sequential; most requests resolve in one or two
//! - Unknown domains never reach the store
//! - Store errors propagate instead of falling through to NoMatch

use std::collections::HashSet;
use std::sync::Arc;

use crate::routing::normalize::normalize;
use crate::routing::record::RouteRecord;
use crate::routing::store::{RouteKey, RouteStore, StoreError};

/// A route matched for one request.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    /// Key that matched: the exact path or a wildcard pattern.
    pub key: RouteKey,
    pub record: RouteRecord,
    /// Canonical form of the request path.
    pub request_path: String,
}

impl ResolvedRoute {
    /// Whether the route matched through a wildcard pattern.
    pub fn is_wildcard(&self) -> bool {
        self.key.is_wildcard()
    }

    /// Part of the request path beyond the wildcard prefix, always starting
    /// with `/`. For `/blog/*` and `/blog/post` this is `/post`.
    pub fn wildcard_remainder(&self) -> &str {
        let prefix = self
            .key
            .path()
            .strip_suffix("/*")
            .unwrap_or(self.key.path());
        match self.request_path.strip_prefix(prefix) {
            Some(rest) if rest.starts_with('/') => rest,
            _ => "/",
        }
    }
}

/// Wildcard patterns to probe for a canonical path, most specific first.
///
/// `/blog/post/123` yields `/blog/post/*`, `/blog/*`, `/*`. The root path
/// yields only `/*`.
pub fn wildcard_candidates(canonical: &str) -> Vec<String> {
    let segments: Vec<&str> = canonical.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return vec!["/*".to_string()];
    }

    (0..segments.len())
        .rev()
        .map(|i| {
            if i == 0 {
                "/*".to_string()
            } else {
                format!("/{}/*", segments[..i].join("/"))
            }
        })
        .collect()
}

/// Resolves (domain, path) pairs against a route store.
#[derive(Clone)]
pub struct RouteResolver {
    store: Arc<dyn RouteStore>,
    domains: Arc<HashSet<String>>,
}

impl RouteResolver {
    /// Create a resolver serving the given domain allow-list.
    pub fn new(store: Arc<dyn RouteStore>, domains: impl IntoIterator<Item = String>) -> Self {
        Self {
            store,
            domains: Arc::new(domains.into_iter().map(|d| d.to_lowercase()).collect()),
        }
    }

    pub fn serves(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    /// Resolve a request to its route.
    ///
    /// Returns `Ok(None)` when nothing matches and `Err` when the store fails.
    pub async fn resolve(
        &self,
        domain: &str,
        raw_path: &str,
    ) -> Result<Option<ResolvedRoute>, StoreError> {
        if !self.serves(domain) {
            tracing::debug!(domain = %domain, "Domain not in allow-list");
            return Ok(None);
        }

        let request_path = normalize(raw_path);

        let exact = RouteKey::new(domain, request_path.clone());
        if let Some(record) = self.probe(&exact).await? {
            return Ok(Some(ResolvedRoute {
                key: exact,
                record,
                request_path,
            }));
        }

        for candidate in wildcard_candidates(&request_path) {
            let key = RouteKey::new(domain, candidate);
            if let Some(record) = self.probe(&key).await? {
                tracing::trace!(key = %key, path = %request_path, "Wildcard route matched");
                return Ok(Some(ResolvedRoute {
                    key,
                    record,
                    request_path,
                }));
            }
        }

        Ok(None)
    }

    async fn probe(&self, key: &RouteKey) -> Result<Option<RouteRecord>, StoreError> {
        match self.store.get(key).await? {
            Some(record) if record.enabled => Ok(Some(record)),
            Some(_) => {
                tracing::trace!(key = %key, "Skipping disabled route");
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
