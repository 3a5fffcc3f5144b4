//! Route store adapter.
//!
//! # Responsibilities
//! - Define the composite route key and its storage encoding
//! - Abstract point-gets against an external key-value store
//! - Provide an in-memory store for seeds, tooling and tests
//!
//! # Design Decisions
//! - Keys join domain and path with `:`, which cannot occur in a domain
//! - Values are JSON, as the external store holds them
//! - A malformed value is a store error, not an absent route

use std::fmt;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use crate::routing::record::RouteRecord;

/// Composite key identifying one route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    domain: String,
    path: String,
}

impl RouteKey {
    pub fn new(domain: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            path: path.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the path is a wildcard pattern.
    pub fn is_wildcard(&self) -> bool {
        self.path.ends_with("/*")
    }

    /// Encoded key as stored in the external store.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.domain, self.path)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.path)
    }
}

/// Errors from the route store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("route store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be decoded.
    #[error("malformed route record at '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Point-get access to stored routes.
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Fetch the record stored under `key`, if any.
    async fn get(&self, key: &RouteKey) -> Result<Option<RouteRecord>, StoreError>;
}

/// Route store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRouteStore {
    entries: DashMap<String, String>,
}

impl InMemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record under `domain`, keyed by the record's own path.
    pub fn insert(&self, domain: &str, record: &RouteRecord) -> Result<(), serde_json::Error> {
        let key = RouteKey::new(domain, record.path.clone());
        let value = serde_json::to_string(record)?;
        self.entries.insert(key.storage_key(), value);
        Ok(())
    }

    /// Store a raw JSON value, bypassing serialization.
    pub fn insert_raw(&self, key: &RouteKey, value: impl Into<String>) {
        self.entries.insert(key.storage_key(), value.into());
    }

    pub fn remove(&self, key: &RouteKey) -> bool {
        self.entries.remove(&key.storage_key()).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RouteStore for InMemoryRouteStore {
    async fn get(&self, key: &RouteKey) -> Result<Option<RouteRecord>, StoreError> {
        let storage_key = key.storage_key();
        let Some(value) = self.entries.get(&storage_key).map(|v| v.value().clone()) else {
            return Ok(None);
        };
        serde_json::from_str(&value)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                key: storage_key,
                source,
            })
    }
}
