//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::routing::RouteRecord;

/// Root configuration for the edge router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Allow-list of domains this router serves.
    pub domains: Vec<String>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Outbound proxy settings.
    pub proxy: ProxyConfig,

    /// Object serving and edge cache settings.
    pub objects: ObjectsConfig,

    /// Bucket bindings by name.
    pub buckets: BucketsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Routes loaded into the in-memory route store at startup.
    pub routes: Vec<SeedRoute>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout enforced by the HTTP layer, in seconds.
    pub request_secs: u64,

    /// How long shutdown waits for background tasks, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            shutdown_grace_secs: 10,
        }
    }
}

/// Proxy handler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Default upstream timeout in seconds.
    pub timeout_secs: u64,

    /// Skip the private-address checks on proxy targets. Development only.
    pub allow_private_targets: bool,
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            allow_private_targets: false,
        }
    }
}

/// Object serving configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObjectsConfig {
    /// Bucket used when a route names none.
    pub default_bucket: String,

    /// Cache-Control used when a route sets none.
    pub cache_control: String,

    /// Maximum number of cached responses.
    pub cache_max_entries: usize,

    /// Objects larger than this are served but never cached.
    pub cache_max_object_bytes: usize,
}

impl Default for ObjectsConfig {
    fn default() -> Self {
        Self {
            default_bucket: "files".to_string(),
            cache_control: "public, max-age=3600".to_string(),
            cache_max_entries: 1024,
            cache_max_object_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Bucket bindings keyed by name.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BucketsConfig(pub BTreeMap<String, BucketConfig>);

impl Default for BucketsConfig {
    fn default() -> Self {
        let mut buckets = BTreeMap::new();
        buckets.insert("files".to_string(), BucketConfig::Memory);
        Self(buckets)
    }
}

impl BucketsConfig {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BucketConfig)> {
        self.0.iter()
    }
}

/// Backend for one bucket.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BucketConfig {
    /// In-process store. Nothing fills it from configuration, so it serves
    /// only objects put through the API; the built-in `files` default is one.
    Memory,
    /// Files under a local directory.
    Filesystem { root: PathBuf },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A route record bound to its domain, as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedRoute {
    pub domain: String,

    #[serde(flatten)]
    pub record: RouteRecord,
}
