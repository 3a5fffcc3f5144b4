//! Edge cache for object responses.
//!
//! # Responsibilities
//! - Derive cache keys from requests
//! - Store and replay complete responses
//! - Bound memory use by entry count and per-object size
//!
//! # Design Decisions
//! - Keys always use GET so HEAD and GET share an entry
//! - Eviction picks an arbitrary entry; no recency tracking
//! - Objects over the size limit are never cached

use std::fmt;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use dashmap::DashMap;
use futures_util::{Stream, StreamExt};
use thiserror::Error;

/// Cache key: normalized method, host, path and query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(host: &str, path_and_query: &str) -> Self {
        Self(format!("GET {}{}", host.to_ascii_lowercase(), path_and_query))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully buffered response held in the cache.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    /// Rebuild a response; the cached copy stays intact.
    pub fn to_response(&self) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("object exceeds the cacheable size of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read body for caching: {0}")]
    Body(#[from] io::Error),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Response cache consulted before object reads.
#[async_trait]
pub trait EdgeCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>, CacheError>;

    async fn put(&self, key: CacheKey, response: CachedResponse) -> Result<(), CacheError>;
}

/// Bounded in-process cache.
#[derive(Clone)]
pub struct MemoryEdgeCache {
    inner: Arc<DashMap<CacheKey, CachedResponse>>,
    max_entries: usize,
    max_object_bytes: usize,
}

impl MemoryEdgeCache {
    pub fn new(max_entries: usize, max_object_bytes: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            max_entries,
            max_object_bytes,
        }
    }

    pub fn max_object_bytes(&self) -> usize {
        self.max_object_bytes
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn evict_one(&self) {
        let victim = self.inner.iter().next().map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.inner.remove(&key);
            tracing::trace!(key = %key, "Evicted cache entry");
        }
    }
}

#[async_trait]
impl EdgeCache for MemoryEdgeCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>, CacheError> {
        Ok(self.inner.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: CacheKey, response: CachedResponse) -> Result<(), CacheError> {
        if response.len() > self.max_object_bytes {
            return Err(CacheError::TooLarge {
                limit: self.max_object_bytes,
            });
        }
        if self.max_entries == 0 {
            return Ok(());
        }
        while !self.inner.contains_key(&key) && self.inner.len() >= self.max_entries {
            self.evict_one();
        }
        self.inner.insert(key, response);
        Ok(())
    }
}

/// Buffer a body stream for caching, giving up once it passes `limit` bytes.
pub async fn collect_body<S>(mut body: S, limit: usize) -> Result<Bytes, CacheError>
where
    S: Stream<Item = Result<Bytes, io::Error>> + Unpin,
{
    let mut buf = Vec::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Err(CacheError::TooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}
