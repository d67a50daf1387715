//! Metric families this exporter produces.

/// Prefix applied to every metric family name on exposition.
pub const NAMESPACE: &str = "gcp";

/// A metric family: name, help text, and its fixed label schema.
#[derive(Debug, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

impl MetricDesc {
    /// Exposed family name, e.g. `gcp_url_map_matchers`.
    pub fn fq_name(&self) -> String {
        format!("{NAMESPACE}_{}", self.name)
    }
}

pub static PROJECT: MetricDesc = MetricDesc {
    name: "project",
    help: "GCP Project",
    labels: &["project", "region"],
};

pub static CLUSTER: MetricDesc = MetricDesc {
    name: "cluster",
    help: "GCP Kubernetes cluster",
    labels: &["cluster_name"],
};

pub static URL_MAP_MATCHERS: MetricDesc = MetricDesc {
    name: "url_map_matchers",
    help: "GCP URL map matchers.",
    labels: &["url_map", "host", "path", "backend_service"],
};

pub static FORWARDING_RULES: MetricDesc = MetricDesc {
    name: "forwarding_rules",
    help: "GCP forwarding rules.",
    labels: &[
        "name",
        "ip_address",
        "load_balancing_scheme",
        "network_tier",
        "ip_protocol",
        "kubernetes_resource",
        "kubernetes_namespace",
        "kubernetes_name",
    ],
};

/// Every family, in exposition order.
pub static DESCRIPTORS: [&MetricDesc; 4] = [&PROJECT, &CLUSTER, &URL_MAP_MATCHERS, &FORWARDING_RULES];

/// One sample: a family, label values in schema order, and a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub metric: &'static MetricDesc,
    pub labels: Vec<String>,
    pub value: f64,
}

impl Observation {
    /// A presence gauge (value 1.0).
    pub fn present(metric: &'static MetricDesc, labels: Vec<String>) -> Self {
        debug_assert_eq!(labels.len(), metric.labels.len(), "{} label arity", metric.name);
        Self {
            metric,
            labels,
            value: 1.0,
        }
    }

    /// Value of the named label, if the schema has it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.metric
            .labels
            .iter()
            .position(|l| *l == name)
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
    }
}
