//! Daemon configuration: flags with environment-variable fallbacks.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;

use gcpstate_compute::{CREDENTIALS_ENV, DEFAULT_COMPUTE_ENDPOINT, DEFAULT_METADATA_HOST};
use gcpstate_metrics::RefreshConfig;
use gcpstate_state::ProjectScope;

#[derive(Parser)]
#[command(
    name = "gcpstated",
    version,
    about = "Exports GCP load-balancer state as Prometheus metrics"
)]
pub struct Config {
    /// GCP project to read resources from.
    #[arg(long, env = "GCP_PROJECT")]
    pub project: String,

    /// GCP region to read resources from.
    #[arg(long, env = "GCP_REGION")]
    pub region: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value = "19283")]
    pub port: u16,

    /// Minimum snapshot age before a scrape triggers a refresh.
    #[arg(long, env = "SYNC_INTERVAL", default_value = "5m", value_parser = parse_duration)]
    pub sync_interval: Duration,

    /// Deadline for each resource fetch.
    #[arg(long, env = "SYNC_TIMEOUT", default_value = "2m", value_parser = parse_duration)]
    pub sync_timeout: Duration,

    /// Cluster name to report. Discovered from the metadata server if unset.
    #[arg(long, env = "CLUSTER_NAME")]
    pub cluster_name: Option<String>,

    /// Static bearer token, never refreshed. Overrides every other source.
    #[arg(long, env = "GCP_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Service-account key or gcloud credentials file. Falls back to the
    /// gcloud well-known file, then the metadata server.
    #[arg(long, env = CREDENTIALS_ENV)]
    pub credentials_file: Option<PathBuf>,

    /// Compute Engine API endpoint.
    #[arg(long, env = "COMPUTE_ENDPOINT", default_value = DEFAULT_COMPUTE_ENDPOINT)]
    pub compute_endpoint: String,

    /// GCE metadata server (host:port).
    #[arg(long, env = "GCE_METADATA_HOST", default_value = DEFAULT_METADATA_HOST)]
    pub metadata_host: String,
}

impl Config {
    /// Reject configurations the exporter cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.project.trim().is_empty() || self.region.trim().is_empty() {
            bail!("GCP_PROJECT and GCP_REGION must be defined");
        }
        if self.sync_interval.is_zero() {
            bail!("sync interval must be greater than zero");
        }
        if self.sync_timeout.is_zero() {
            bail!("sync timeout must be greater than zero");
        }
        Ok(())
    }

    pub fn scope(&self) -> ProjectScope {
        ProjectScope::new(self.project.trim(), self.region.trim())
    }

    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            interval: self.sync_interval,
            fetch_timeout: self.sync_timeout,
        }
    }
}

/// Parse a duration string like "500ms", "30s", "5m", "1h", or a bare
/// number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s, "s"),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration {s:?}"))?;

    let secs = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration {s:?} is too large"))
    };
    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => secs(1),
        "m" => secs(60),
        "h" => secs(3600),
        _ => Err(format!("invalid duration unit in {s:?} (expected ms, s, m or h)")),
    }
}
