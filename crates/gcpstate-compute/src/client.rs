//! The resource client boundary.

use std::future::Future;
use std::pin::Pin;

use gcpstate_state::{ForwardingRule, ProjectScope, UrlMap};

use crate::error::{FetchError, FetchResult};

pub(crate) const USER_AGENT: &str = concat!("gcpstate/", env!("CARGO_PKG_VERSION"));

/// Boxed `Send` future, so `ResourceClient` stays object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lists the resource collections for a project scope.
///
/// Implementations make a single best-effort attempt per call: no caching
/// and no retries. The caller bounds each call with its own deadline.
pub trait ResourceClient: Send + Sync {
    fn list_url_maps<'a>(&'a self, scope: &'a ProjectScope)
    -> BoxFuture<'a, FetchResult<Vec<UrlMap>>>;

    fn list_forwarding_rules<'a>(
        &'a self,
        scope: &'a ProjectScope,
    ) -> BoxFuture<'a, FetchResult<Vec<ForwardingRule>>>;
}

/// HTTP client for the Compute API and the OAuth token endpoint.
pub(crate) fn http_client() -> FetchResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| FetchError::Http(e.to_string()))
}
