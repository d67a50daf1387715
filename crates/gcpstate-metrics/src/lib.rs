//! gcpstate-metrics — the refresh/cache engine behind the exporter.
//!
//! Keeps the snapshot of Compute Engine resources fresh without ever
//! making a scrape wait on the cloud API, and flattens that snapshot into
//! fixed-schema gauge observations.
//!
//! # Architecture
//!
//! ```text
//! GcpCollector (one per scope)
//!   ├── collect()
//!   │     ├── RefreshCoordinator::maybe_refresh(now)  (never blocks)
//!   │     │     └── spawned refresh task → SnapshotStore::replace()
//!   │     ├── SnapshotStore::read()
//!   │     └── flatten_snapshot() → Vec<Observation>
//!   └── render() → render_prometheus() → text/plain for /metrics
//! ```
//!
//! # Refresh policy
//!
//! Staleness checks piggyback on scrapes: there is no background timer.
//! At most one refresh runs at a time. URL maps and forwarding rules are
//! fetched independently, so one failing kind never discards the other.
//! The refresh clock is reset whether or not the fetch succeeded.

pub mod collector;
pub mod flatten;
pub mod observation;
pub mod prometheus;
pub mod refresh;

#[cfg(test)]
pub(crate) mod testing;

pub use collector::GcpCollector;
pub use flatten::{flatten_snapshot, KubernetesOwner};
pub use observation::{MetricDesc, Observation, DESCRIPTORS};
pub use prometheus::{CONTENT_TYPE, render_prometheus};
pub use refresh::{RefreshConfig, RefreshCoordinator, RefreshReport, RefreshTrigger};
