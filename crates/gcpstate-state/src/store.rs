//! The single current snapshot shared by scrapes and refreshes.
//!
//! Backed by `ArcSwap`, so a read is a pointer load and a replace is a
//! pointer store. There is no lock a reader can be starved on, and no
//! reader can observe a half-built snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::types::Snapshot;

/// Holds the most recent snapshot. No history is retained.
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
}

impl SnapshotStore {
    /// Create a store holding the empty startup snapshot.
    pub fn new() -> Self {
        Self::with_snapshot(Snapshot::empty())
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// Shared handle, the way the daemon wires it.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// The current snapshot. Never blocks, never fails.
    pub fn read(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Swap in a new snapshot, visible to every subsequent `read`.
    pub fn replace(&self, snapshot: Snapshot) {
        debug!(
            url_maps = snapshot.url_maps.len(),
            forwarding_rules = snapshot.forwarding_rules.len(),
            "snapshot replaced"
        );
        self.current.store(Arc::new(snapshot));
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ForwardingRule, UrlMap};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    /// A snapshot whose every field encodes `generation`, so a torn read
    /// is detectable.
    fn generation(generation: usize) -> Snapshot {
        let tag = generation.to_string();
        Snapshot::new(
            (0..generation)
                .map(|_| UrlMap {
                    name: tag.clone(),
                    ..Default::default()
                })
                .collect(),
            (0..generation)
                .map(|_| ForwardingRule {
                    name: tag.clone(),
                    ..Default::default()
                })
                .collect(),
            UNIX_EPOCH + Duration::from_secs(generation as u64),
        )
    }

    fn assert_consistent(snap: &Snapshot) {
        let n = snap.url_maps.len();
        assert_eq!(snap.forwarding_rules.len(), n);
        let tag = n.to_string();
        assert!(snap.url_maps.iter().all(|m| m.name == tag));
        assert!(snap.forwarding_rules.iter().all(|r| r.name == tag));
        if n > 0 {
            assert_eq!(
                snap.fetched_at,
                Some(UNIX_EPOCH + Duration::from_secs(n as u64))
            );
        }
    }

    #[test]
    fn starts_empty() {
        let store = SnapshotStore::new();
        let snap = store.read();
        assert!(snap.is_empty());
        assert!(snap.fetched_at.is_none());
    }

    #[test]
    fn read_after_replace_returns_replacement() {
        let store = SnapshotStore::new();
        let snap = generation(3);
        store.replace(snap.clone());
        assert_eq!(*store.read(), snap);
    }

    #[test]
    fn old_readers_keep_their_view() {
        let store = SnapshotStore::new();
        store.replace(generation(1));
        let held = store.read();

        store.replace(generation(2));

        assert_eq!(held.url_maps.len(), 1);
        assert_eq!(store.read().url_maps.len(), 2);
    }

    #[test]
    fn concurrent_readers_never_see_torn_snapshots() {
        let store = Arc::new(SnapshotStore::new());
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let done = done.clone();
                std::thread::spawn(move || {
                    while !done.load(Ordering::Acquire) {
                        assert_consistent(&store.read());
                    }
                })
            })
            .collect();

        for i in 1..=200 {
            let snap = generation(i % 17);
            store.replace(snap.clone());
            // The writer always sees its own write.
            assert_eq!(*store.read(), snap);
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn fetched_at_is_preserved() {
        let now = SystemTime::now();
        let store = SnapshotStore::new();
        store.replace(Snapshot::new(Vec::new(), Vec::new(), now));
        assert_eq!(store.read().fetched_at, Some(now));
    }
}
