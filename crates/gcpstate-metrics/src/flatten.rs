//! Snapshot flattening.
//!
//! Pure functions from an immutable snapshot to observations. Nothing here
//! fails: dangling path-matcher references, duplicate names and malformed
//! descriptions all degrade to fewer observations or empty labels.

use std::collections::HashMap;

use serde_json::{Map, Value};

use gcpstate_state::{ForwardingRule, PathMatcher, ProjectScope, Snapshot, UrlMap};

use crate::observation::{Observation, CLUSTER, FORWARDING_RULES, PROJECT, URL_MAP_MATCHERS};

/// Flatten a snapshot into the full observation stream for one scrape.
///
/// Order: project, cluster, URL map matchers, forwarding rules. The order
/// within each family follows the snapshot, so equal snapshots always
/// flatten to equal streams.
pub fn flatten_snapshot(
    scope: &ProjectScope,
    cluster_name: &str,
    snapshot: &Snapshot,
) -> Vec<Observation> {
    let mut out = vec![
        Observation::present(&PROJECT, vec![scope.project.clone(), scope.region.clone()]),
        Observation::present(&CLUSTER, vec![cluster_name.to_string()]),
    ];
    for url_map in &snapshot.url_maps {
        flatten_url_map(url_map, &mut out);
    }
    out.extend(snapshot.forwarding_rules.iter().map(flatten_forwarding_rule));
    out
}

// ── URL maps ───────────────────────────────────────────────────────

/// Emit one observation per (host, path rule, path) reachable through each
/// host rule's path matcher.
pub fn flatten_url_map(url_map: &UrlMap, out: &mut Vec<Observation>) {
    let mut matchers: HashMap<&str, &PathMatcher> = HashMap::new();
    for matcher in &url_map.path_matchers {
        // First definition wins.
        matchers.entry(matcher.name.as_str()).or_insert(matcher);
    }

    for host_rule in &url_map.host_rules {
        let Some(matcher) = matchers.get(host_rule.path_matcher.as_str()) else {
            continue;
        };
        for host in &host_rule.hosts {
            for rule in &matcher.path_rules {
                let backend = backend_short_name(&rule.service);
                for path in &rule.paths {
                    out.push(Observation::present(
                        &URL_MAP_MATCHERS,
                        vec![
                            url_map.name.clone(),
                            host.clone(),
                            path.clone(),
                            backend.to_string(),
                        ],
                    ));
                }
            }
        }
    }
}

/// Last `/`-delimited segment of a backend service resource URL.
pub fn backend_short_name(service_url: &str) -> &str {
    service_url.rsplit('/').next().unwrap_or(service_url)
}

// ── Forwarding rules ───────────────────────────────────────────────

/// Description keys GKE writes to name a rule's owner, in priority order.
const OWNER_KEYS: [(&str, &str); 3] = [
    ("networking.gke.io/service-name", "service"),
    ("kubernetes.io/service-name", "service"),
    ("kubernetes.io/ingress-name", "ingress"),
];

/// The Kubernetes object that owns a forwarding rule, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KubernetesOwner {
    /// `"service"`, `"ingress"`, or empty.
    pub resource: &'static str,
    pub namespace: String,
    pub name: String,
}

impl KubernetesOwner {
    /// Parse a forwarding-rule description. Anything unrecognised yields
    /// the empty owner.
    pub fn from_description(description: &str) -> Self {
        // Repeated keys keep the last value.
        let Ok(fields) = serde_json::from_str::<Map<String, Value>>(description) else {
            return Self::default();
        };

        let mut owner = None;
        for (key, resource) in OWNER_KEYS {
            match fields.get(key) {
                None | Some(Value::Null) => {}
                Some(Value::String(name)) => {
                    if owner.is_none() && !name.is_empty() {
                        owner = Some((resource, name.as_str()));
                    }
                }
                // A mistyped owner key invalidates the whole annotation.
                Some(_) => return Self::default(),
            }
        }
        let Some((resource, full_name)) = owner else {
            return Self::default();
        };

        // A name without a namespace keeps the resource kind but nothing else.
        let (namespace, name) = full_name
            .split_once('/')
            .map(|(ns, name)| (ns.to_string(), name.to_string()))
            .unwrap_or_default();

        Self {
            resource,
            namespace,
            name,
        }
    }
}

pub fn flatten_forwarding_rule(rule: &ForwardingRule) -> Observation {
    let owner = KubernetesOwner::from_description(&rule.description);
    Observation::present(
        &FORWARDING_RULES,
        vec![
            rule.name.clone(),
            rule.ip_address.clone(),
            rule.load_balancing_scheme.clone(),
            rule.network_tier.clone(),
            rule.ip_protocol.clone(),
            owner.resource.to_string(),
            owner.namespace,
            owner.name,
        ],
    )
}
