//! gcpstated — the gcpstate exporter daemon.
//!
//! Polls the Compute Engine API for regional URL maps and forwarding rules
//! and serves them as Prometheus gauges. Refreshes piggyback on scrapes:
//! a scrape never waits for the API, it triggers a background refresh
//! when the snapshot is older than the sync interval.
//!
//! # Usage
//!
//! ```text
//! GCP_PROJECT=my-proj GCP_REGION=us-central1 gcpstated --sync-interval 5m
//! ```

mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use gcpstate_compute::{ComputeClient, MetadataClient, TokenSource};
use gcpstate_metrics::GcpCollector;

use crate::config::Config;

/// Deadline for metadata server calls (cluster name, access tokens).
const METADATA_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,gcpstated=debug,gcpstate=debug")
        }))
        .init();

    let config = Config::parse();
    config.validate()?;

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    let scope = config.scope();
    info!(%scope, "gcpstated starting");

    let metadata = MetadataClient::new(&config.metadata_host, METADATA_TIMEOUT)?;

    let cluster_name = match config.cluster_name.clone() {
        Some(name) => name,
        None => metadata.discover_cluster_name().await,
    };

    let tokens = match config.access_token.clone() {
        Some(token) => {
            warn!("using a static access token; it is never refreshed");
            TokenSource::Static(token)
        }
        None => TokenSource::application_default(config.credentials_file.as_deref(), metadata)?,
    };
    let client = ComputeClient::new(&config.compute_endpoint, tokens)?;

    let collector = Arc::new(GcpCollector::new(
        scope,
        cluster_name,
        Arc::new(client),
        config.refresh_config(),
    ));
    let refresh = collector.refresher().config();
    info!(
        scope = %collector.scope(),
        cluster = %collector.cluster_name(),
        interval_secs = refresh.interval.as_secs(),
        timeout_secs = refresh.fetch_timeout.as_secs(),
        "collector initialized"
    );

    // Prime the cache so the first scrape is likely to find data.
    let _ = collector.refresher().maybe_refresh(Instant::now());

    let router = gcpstate_api::build_router(collector);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gcpstated stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
