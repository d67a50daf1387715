//! gcpstate-state — resource model and snapshot store for gcpstate.
//!
//! Holds the Compute Engine resources the exporter reports on (URL maps
//! and forwarding rules) and the single in-memory snapshot that scrapes
//! read from.
//!
//! # Architecture
//!
//! ```text
//! SnapshotStore
//!   ├── read()    → Arc<Snapshot>   (wait-free, never blocks on a refresh)
//!   └── replace() ← new Snapshot    (atomic pointer swap)
//! ```
//!
//! Snapshots are immutable once built. A refresh always builds a new
//! snapshot and swaps it in whole; readers holding the previous `Arc`
//! keep a consistent view until they drop it.

pub mod store;
pub mod types;

pub use store::SnapshotStore;
pub use types::*;
