//! gcpstate-compute — the boundary between gcpstate and the cloud API.
//!
//! Lists the two resource collections the exporter reports on and talks
//! to the GCE metadata server for credentials and the cluster name.
//!
//! # Architecture
//!
//! ```text
//! ResourceClient (trait, object-safe)
//!   └── ComputeClient
//!         ├── list_url_maps()         → GET .../regions/{r}/urlMaps
//!         ├── list_forwarding_rules() → GET .../regions/{r}/forwardingRules
//!         └── TokenSource
//!               ├── Static(token)
//!               └── Refreshing (cached until shortly before expiry)
//!                     ├── Credentials → service-account JWT or gcloud refresh token
//!                     └── Metadata → MetadataClient
//! ```
//!
//! Every call is a single attempt. Deadlines are imposed by the caller;
//! retrying is left to the next polling cycle.

pub mod auth;
pub mod client;
pub mod compute;
pub mod credentials;
pub mod error;
pub mod metadata;

#[cfg(test)]
pub(crate) mod test_server;

pub use auth::TokenSource;
pub use client::{BoxFuture, ResourceClient};
pub use compute::{ComputeClient, DEFAULT_COMPUTE_ENDPOINT};
pub use credentials::{CREDENTIALS_ENV, Credentials};
pub use error::{FetchError, FetchResult};
pub use metadata::{MetadataClient, DEFAULT_METADATA_HOST};
