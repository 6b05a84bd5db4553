use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default number of probes allowed in flight at once
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 8;

/// Default per-link timeout in milliseconds
pub const DEFAULT_PER_LINK_TIMEOUT_MS: u64 = 6_000;

/// Healthy responses slower than this are downgraded to `Warning`
pub const DEFAULT_SLOW_THRESHOLD_MS: u64 = 3_000;

/// Hosts trusted for promotion when no allowlist is configured
pub const DEFAULT_TRUSTED_HOSTS: &[&str] = &["gofile.io"];

/// A download link produced by a link extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLink {
    pub url: String,

    /// Host label as shown by the source (e.g. "gofile.io", "GDrive")
    #[serde(default)]
    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl RawLink {
    /// Build a link whose host label is derived from the URL.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let host = url_host(&url).unwrap_or_default();
        Self {
            url,
            host,
            quality: None,
            size: None,
            language: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    /// Whether the link's host label or URL host is, or is a subdomain of,
    /// any of `trusted_hosts`. Case-insensitive.
    pub fn is_trusted(&self, trusted_hosts: &[String]) -> bool {
        let label = self.host.trim().to_lowercase();
        let url_host = url_host(&self.url);

        trusted_hosts.iter().any(|trusted| {
            let trusted = trusted.trim().to_lowercase();
            !trusted.is_empty()
                && (host_matches(&label, &trusted)
                    || url_host.as_deref().is_some_and(|h| host_matches(h, &trusted)))
        })
    }
}

fn host_matches(host: &str, trusted: &str) -> bool {
    host == trusted
        || host
            .strip_suffix(trusted)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

pub(crate) fn url_host(raw: &str) -> Option<String> {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Closed classification of a probed link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Reachable and serving content
    Healthy,
    /// Needs an extra unlock step (redirect or interstitial page)
    Locked,
    /// Ambiguous, slow or partial response
    Warning,
    /// Unreachable, error status or timeout
    Dead,
}

impl HealthStatus {
    /// Position in output ordering after priority links.
    pub fn order(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Locked => 1,
            HealthStatus::Warning => 2,
            HealthStatus::Dead => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Locked => "locked",
            HealthStatus::Warning => "warning",
            HealthStatus::Dead => "dead",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one probe of one link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthVerdict {
    pub status: HealthStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Trusted host responding healthily
    #[serde(default)]
    pub priority: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,

    /// Where redirects ended up, when followed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,

    pub checked_at: DateTime<Utc>,
}

impl HealthVerdict {
    pub fn new(status: HealthStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            response_code: None,
            reason: Some(reason.into()),
            priority: false,
            response_time_ms: None,
            final_url: None,
            checked_at: Utc::now(),
        }
    }

    pub fn dead(reason: impl Into<String>) -> Self {
        Self::new(HealthStatus::Dead, reason)
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.response_code = Some(code);
        self
    }
}

/// A link paired with its verdict, as returned by the health engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckedLink {
    pub link: RawLink,
    pub verdict: HealthVerdict,
}

/// Options for a batch of link checks.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthOptions {
    pub concurrency_limit: usize,
    pub per_link_timeout: Duration,
    pub slow_threshold: Duration,
    pub trusted_hosts: Vec<String>,
}

impl Default for HealthOptions {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            per_link_timeout: Duration::from_millis(DEFAULT_PER_LINK_TIMEOUT_MS),
            slow_threshold: Duration::from_millis(DEFAULT_SLOW_THRESHOLD_MS),
            trusted_hosts: DEFAULT_TRUSTED_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl HealthOptions {
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_timeout(mut self, per_link_timeout: Duration) -> Self {
        self.per_link_timeout = per_link_timeout;
        self
    }

    pub fn with_trusted_hosts(mut self, hosts: Vec<String>) -> Self {
        self.trusted_hosts = hosts;
        self
    }
}
