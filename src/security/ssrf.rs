//! SSRF guard for proxy targets.
//!
//! # Responsibilities
//! - Require an absolute http(s) URL
//! - Reject loopback, private, link-local, unique-local and unspecified hosts
//! - Reject localhost names and cloud metadata endpoints
//!
//! # Design Decisions
//! - Pattern based on the parsed host; no DNS resolution, so a public name
//!   that later resolves to a private address is not caught here
//! - The WHATWG parser canonicalizes IPv4 spellings (`0x7f.1`, `2130706433`)
//!   before the checks run

use std::net::{Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use url::{Host, Url};

/// Hostnames that always point at the local machine or a metadata service.
const DENIED_HOSTNAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "ip6-localhost",
    "ip6-loopback",
    "metadata",
    "metadata.google.internal",
    "metadata.goog",
    "instance-data",
    "instance-data.ec2.internal",
];

/// Metadata addresses outside the reserved ranges checked below.
const DENIED_IPV4: &[Ipv4Addr] = &[
    // Alibaba Cloud
    Ipv4Addr::new(100, 100, 100, 200),
];

/// Why a target URL was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("target is not a valid absolute URL")]
    Malformed,

    #[error("scheme '{0}' is not allowed; only http and https are supported")]
    Scheme(String),

    #[error("target URL has no host")]
    MissingHost,

    #[error("host '{0}' is a private or reserved address")]
    PrivateAddress(String),

    #[error("host '{0}' is not allowed")]
    DeniedHost(String),

    #[error("host header override '{0}' is not a valid header value")]
    HostHeader(String),
}

/// Validates outbound targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SsrfGuard {
    allow_private: bool,
}

impl SsrfGuard {
    /// Guard with every rule enforced.
    pub fn strict() -> Self {
        Self {
            allow_private: false,
        }
    }

    /// Guard that skips the host rules. Scheme and URL shape still apply.
    pub fn allowing_private_targets() -> Self {
        Self {
            allow_private: true,
        }
    }

    pub fn allows_private(&self) -> bool {
        self.allow_private
    }

    /// Validate `target`, returning the parsed URL on success.
    pub fn validate(&self, target: &str) -> Result<Url, TargetError> {
        let url = Url::parse(target).map_err(|_| TargetError::Malformed)?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(TargetError::Scheme(other.to_string())),
        }

        let host = url.host().ok_or(TargetError::MissingHost)?;
        if !self.allow_private {
            check_host(&host)?;
        }

        Ok(url)
    }
}

/// Validate with every rule enforced.
pub fn validate_target_url(target: &str) -> Result<Url, TargetError> {
    SsrfGuard::strict().validate(target)
}

fn check_host(host: &Host<&str>) -> Result<(), TargetError> {
    match host {
        Host::Domain(name) => {
            let name = name.trim_end_matches('.').to_ascii_lowercase();
            if DENIED_HOSTNAMES.contains(&name.as_str()) || name.ends_with(".localhost") {
                return Err(TargetError::DeniedHost(name));
            }
            Ok(())
        }
        Host::Ipv4(ip) => {
            if DENIED_IPV4.contains(ip) {
                return Err(TargetError::DeniedHost(ip.to_string()));
            }
            if is_reserved_ipv4(ip) {
                return Err(TargetError::PrivateAddress(ip.to_string()));
            }
            Ok(())
        }
        Host::Ipv6(ip) => {
            if is_reserved_ipv6(ip) {
                return Err(TargetError::PrivateAddress(ip.to_string()));
            }
            Ok(())
        }
    }
}

fn is_reserved_ipv4(ip: &Ipv4Addr) -> bool {
    // 0.0.0.0/8 is the whole "this network" block, not just 0.0.0.0
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.octets()[0] == 0
}

fn is_reserved_ipv6(ip: &Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_reserved_ipv4(&mapped);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xffc0) == 0xfe80 // fe80::/10
        || (first & 0xfe00) == 0xfc00 // fc00::/7
}
