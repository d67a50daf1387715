//! Refresh coordinator: decides when to refetch and keeps it single-flight.
//!
//! A scrape calls [`RefreshCoordinator::maybe_refresh`]. If the snapshot is
//! older than the refresh interval and no refresh is running, a refresh
//! task is spawned and the caller returns immediately with the stale data
//! still in place. The in-flight guard is a one-permit semaphore acquired
//! with `try_acquire_owned`; the permit travels with the task and is
//! released when it ends, however it ends.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use gcpstate_compute::{FetchError, FetchResult, ResourceClient};
use gcpstate_state::{ProjectScope, Snapshot, SnapshotStore};

/// Default minimum age of the snapshot before a scrape triggers a refresh.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default deadline for each resource fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(2 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    pub interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// What a call to `maybe_refresh` did.
#[derive(Debug)]
pub enum RefreshTrigger {
    /// The snapshot is younger than the refresh interval.
    Fresh,
    /// Another refresh is already running; the current snapshot stands.
    InFlight,
    /// A refresh task was spawned.
    Spawned(JoinHandle<RefreshReport>),
}

/// Outcome of one refresh cycle, per resource kind.
#[derive(Debug)]
pub struct RefreshReport {
    /// Number of URL maps committed, or why none were.
    pub url_maps: FetchResult<usize>,
    /// Number of forwarding rules committed, or why none were.
    pub forwarding_rules: FetchResult<usize>,
    pub elapsed: Duration,
}

impl RefreshReport {
    /// Whether a new snapshot was committed.
    pub fn committed(&self) -> bool {
        self.url_maps.is_ok() || self.forwarding_rules.is_ok()
    }

    pub fn is_complete(&self) -> bool {
        self.url_maps.is_ok() && self.forwarding_rules.is_ok()
    }
}

/// Single-flight refresher for one project scope.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    scope: ProjectScope,
    client: Arc<dyn ResourceClient>,
    store: Arc<SnapshotStore>,
    config: RefreshConfig,
    in_flight: Arc<Semaphore>,
    /// Completion time of the last refresh, successful or not.
    last_refresh_at: Mutex<Option<Instant>>,
}

impl RefreshCoordinator {
    pub fn new(
        scope: ProjectScope,
        client: Arc<dyn ResourceClient>,
        store: Arc<SnapshotStore>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                scope,
                client,
                store,
                config,
                in_flight: Arc::new(Semaphore::new(1)),
                last_refresh_at: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> RefreshConfig {
        self.inner.config
    }

    /// When the last refresh finished. `None` before the first one.
    pub fn last_refresh_at(&self) -> Option<Instant> {
        *self.inner.last_refresh_at.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a refresh is running right now.
    pub fn is_refreshing(&self) -> bool {
        self.inner.in_flight.available_permits() == 0
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        self.inner.is_stale(now)
    }

    /// Spawn a refresh if the snapshot is stale and none is running.
    ///
    /// Never waits on the network. Must be called from within a tokio
    /// runtime.
    pub fn maybe_refresh(&self, now: Instant) -> RefreshTrigger {
        if !self.inner.is_stale(now) {
            return RefreshTrigger::Fresh;
        }

        let Ok(permit) = self.inner.in_flight.clone().try_acquire_owned() else {
            debug!(scope = %self.inner.scope, "refresh already in flight, serving cached snapshot");
            return RefreshTrigger::InFlight;
        };

        // A refresh may have completed between the check and the acquire.
        if !self.inner.is_stale(now) {
            return RefreshTrigger::Fresh;
        }

        let inner = self.inner.clone();
        RefreshTrigger::Spawned(tokio::spawn(async move {
            let _permit = permit;
            inner.refresh().await
        }))
    }

    /// Run one refresh cycle inline, ignoring staleness. Returns `None`
    /// if another refresh holds the guard.
    pub async fn refresh_now(&self) -> Option<RefreshReport> {
        let _permit = self.inner.in_flight.clone().try_acquire_owned().ok()?;
        Some(self.inner.refresh().await)
    }
}

impl Inner {
    fn is_stale(&self, now: Instant) -> bool {
        match *self.last_refresh_at.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(last) => now.saturating_duration_since(last) >= self.config.interval,
            None => true,
        }
    }

    async fn refresh(&self) -> RefreshReport {
        // Stamped on drop, before the caller's permit is released.
        let _stamp = StampOnDrop(&self.last_refresh_at);
        let started = Instant::now();
        info!(scope = %self.scope, "starting GCP sync");

        let deadline = self.config.fetch_timeout;
        let (url_maps, forwarding_rules) = tokio::join!(
            with_deadline(deadline, self.client.list_url_maps(&self.scope)),
            with_deadline(deadline, self.client.list_forwarding_rules(&self.scope)),
        );

        let previous = self.store.read();

        let (url_maps, url_maps_result) = match url_maps {
            Ok(maps) => {
                let count = maps.len();
                (maps, Ok(count))
            }
            Err(e) => {
                warn!(scope = %self.scope, error = %e, "failed to list url maps");
                (previous.url_maps.clone(), Err(e))
            }
        };

        let (forwarding_rules, forwarding_rules_result) = match forwarding_rules {
            Ok(rules) => {
                let count = rules.len();
                (rules, Ok(count))
            }
            Err(e) => {
                warn!(scope = %self.scope, error = %e, "failed to list forwarding rules");
                (previous.forwarding_rules.clone(), Err(e))
            }
        };

        let report = RefreshReport {
            url_maps: url_maps_result,
            forwarding_rules: forwarding_rules_result,
            elapsed: started.elapsed(),
        };

        if report.committed() {
            self.store
                .replace(Snapshot::new(url_maps, forwarding_rules, SystemTime::now()));
        } else {
            warn!(scope = %self.scope, "no resources refreshed, keeping previous snapshot");
        }

        info!(
            scope = %self.scope,
            url_maps = ?report.url_maps.as_ref().ok(),
            forwarding_rules = ?report.forwarding_rules.as_ref().ok(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "finished GCP sync"
        );
        report
    }
}

async fn with_deadline<T>(
    deadline: Duration,
    fetch: impl std::future::Future<Output = FetchResult<T>>,
) -> FetchResult<T> {
    tokio::time::timeout(deadline, fetch)
        .await
        .unwrap_or(Err(FetchError::Timeout(deadline)))
}

struct StampOnDrop<'a>(&'a Mutex<Option<Instant>>);

impl Drop for StampOnDrop<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }
}
