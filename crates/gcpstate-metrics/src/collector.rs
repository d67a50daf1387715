//! The collector a scrape calls into.
//!
//! Ties the refresh coordinator, the snapshot store and the flattener
//! together for a single project scope.

use std::sync::Arc;
use std::time::Instant;

use gcpstate_compute::ResourceClient;
use gcpstate_state::{ProjectScope, SnapshotStore};

use crate::flatten::flatten_snapshot;
use crate::observation::{DESCRIPTORS, MetricDesc, Observation};
use crate::prometheus::render_prometheus;
use crate::refresh::{RefreshConfig, RefreshCoordinator};

pub struct GcpCollector {
    scope: ProjectScope,
    cluster_name: String,
    store: Arc<SnapshotStore>,
    refresher: RefreshCoordinator,
}

impl GcpCollector {
    /// Create a collector starting from the empty snapshot.
    pub fn new(
        scope: ProjectScope,
        cluster_name: impl Into<String>,
        client: Arc<dyn ResourceClient>,
        config: RefreshConfig,
    ) -> Self {
        let store = SnapshotStore::shared();
        let refresher = RefreshCoordinator::new(scope.clone(), client, store.clone(), config);
        Self {
            scope,
            cluster_name: cluster_name.into(),
            store,
            refresher,
        }
    }

    pub fn scope(&self) -> &ProjectScope {
        &self.scope
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    /// The metric families this collector can produce.
    pub fn describe(&self) -> &'static [&'static MetricDesc] {
        &DESCRIPTORS
    }

    /// Observations for one scrape. Kicks off a background refresh when
    /// the snapshot is stale but always answers from the current one.
    pub fn collect(&self) -> Vec<Observation> {
        self.collect_at(Instant::now())
    }

    pub fn collect_at(&self, now: Instant) -> Vec<Observation> {
        // A spawned refresh runs detached; this scrape serves what is there.
        let _ = self.refresher.maybe_refresh(now);
        let snapshot = self.store.read();
        flatten_snapshot(&self.scope, &self.cluster_name, &snapshot)
    }

    /// Prometheus text exposition of `collect()`.
    pub fn render(&self) -> String {
        render_prometheus(&self.collect())
    }
}
