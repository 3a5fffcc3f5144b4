//! Stored route records.
//!
//! Records are serialized as camelCase JSON with an internal `type` tag,
//! which is also the shape accepted for seed routes in the config file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted rule mapping (domain, path-or-pattern) to a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    /// Canonical path or wildcard pattern ending in `/*`.
    pub path: String,

    /// Absolute URL for redirect/proxy, object key for objectServe.
    pub target: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    #[serde(flatten)]
    pub kind: RouteKind,
}

impl RouteRecord {
    /// Create an enabled record stamped with the current time.
    pub fn new(path: impl Into<String>, target: impl Into<String>, kind: RouteKind) -> Self {
        let now = Utc::now();
        Self {
            path: path.into(),
            target: target.into(),
            enabled: true,
            created_at: now,
            updated_at: now,
            kind,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether the record's path is a wildcard pattern.
    pub fn is_wildcard(&self) -> bool {
        self.path.ends_with("/*")
    }
}

/// The closed set of handling strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RouteKind {
    Redirect(RedirectOptions),
    Proxy(ProxyOptions),
    ObjectServe(ObjectOptions),
}

impl RouteKind {
    /// Label used in logs, metrics and usage events.
    pub fn type_name(&self) -> &'static str {
        match self {
            RouteKind::Redirect(_) => "redirect",
            RouteKind::Proxy(_) => "proxy",
            RouteKind::ObjectServe(_) => "objectServe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectOptions {
    /// One of 301, 302, 307, 308.
    #[serde(default = "default_redirect_status")]
    pub status_code: u16,

    /// Copy incoming query parameters the target does not define.
    #[serde(default = "default_true")]
    pub preserve_query: bool,

    /// Append the wildcard remainder to the target path.
    #[serde(default)]
    pub preserve_path: bool,
}

impl Default for RedirectOptions {
    fn default() -> Self {
        Self {
            status_code: default_redirect_status(),
            preserve_query: true,
            preserve_path: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyOptions {
    /// Overrides the origin's Cache-Control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,

    /// Host header sent to the origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_header: Option<String>,

    /// Per-route upstream timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectOptions {
    /// Bucket binding name; the configured default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,

    /// Explicit download disposition; content-type driven when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_download: Option<bool>,
}

fn default_true() -> bool {
    true
}

fn default_redirect_status() -> u16 {
    302
}
