//! Domain types for the gcpstate resource model.
//!
//! These mirror the Compute Engine v1 JSON representation closely enough
//! to be deserialized straight from API responses. Every field defaults
//! when absent, so a sparse resource still yields empty strings and lists
//! rather than a decode failure.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

// ── Scope ──────────────────────────────────────────────────────────

/// The (project, region) pair that fixes which resources are fetched.
///
/// Set once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectScope {
    pub project: String,
    pub region: String,
}

impl ProjectScope {
    pub fn new(project: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            region: region.into(),
        }
    }
}

impl std::fmt::Display for ProjectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project, self.region)
    }
}

// ── URL maps ───────────────────────────────────────────────────────

/// Load-balancer routing configuration mapping (host, path) patterns
/// to backend services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UrlMap {
    pub name: String,
    pub host_rules: Vec<HostRule>,
    pub path_matchers: Vec<PathMatcher>,
}

/// A set of hostnames routed through one named path matcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostRule {
    pub hosts: Vec<String>,
    /// Name of a path matcher in the same URL map. May dangle.
    pub path_matcher: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathMatcher {
    pub name: String,
    pub default_service: String,
    pub path_rules: Vec<PathRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathRule {
    /// Full resource URL of the backend service.
    pub service: String,
    pub paths: Vec<String>,
}

// ── Forwarding rules ───────────────────────────────────────────────

/// Binds an IP/protocol to a load-balancer backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForwardingRule {
    pub name: String,
    #[serde(rename = "IPAddress")]
    pub ip_address: String,
    pub load_balancing_scheme: String,
    pub network_tier: String,
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    /// Free text. GKE writes a JSON object naming the owning Service or
    /// Ingress here.
    pub description: String,
}

// ── Snapshot ───────────────────────────────────────────────────────

/// An immutable view of the last fetched resources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub url_maps: Vec<UrlMap>,
    pub forwarding_rules: Vec<ForwardingRule>,
    /// Wall-clock time of the fetch that produced this snapshot. `None`
    /// for the startup snapshot.
    pub fetched_at: Option<SystemTime>,
}

impl Snapshot {
    /// The startup snapshot: no resources, never fetched.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(
        url_maps: Vec<UrlMap>,
        forwarding_rules: Vec<ForwardingRule>,
        fetched_at: SystemTime,
    ) -> Self {
        Self {
            url_maps,
            forwarding_rules,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.url_maps.is_empty() && self.forwarding_rules.is_empty()
    }
}
