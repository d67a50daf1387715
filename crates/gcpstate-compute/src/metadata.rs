//! GCE metadata server access.
//!
//! The metadata server only speaks plain HTTP on the link-local network.
//! Every request carries the `Metadata-Flavor: Google` header, bypasses
//! any configured proxy and is bounded by the client timeout.

use std::time::Duration;

use tracing::{debug, warn};

use crate::client::USER_AGENT;
use crate::error::{FetchError, FetchResult};

/// Default metadata server address (host:port).
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal:80";

const CLUSTER_NAME_PATH: &str = "/computeMetadata/v1/instance/attributes/cluster-name";
pub(crate) const TOKEN_PATH: &str =
    "/computeMetadata/v1/instance/service-accounts/default/token";

/// Minimal client for the GCE metadata server.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: reqwest::Client,
    host: String,
    timeout: Duration,
}

impl MetadataClient {
    pub fn new(host: impl Into<String>, timeout: Duration) -> FetchResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()
            .map_err(|e| FetchError::Metadata(e.to_string()))?;
        Ok(Self {
            http,
            host: host.into(),
            timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// GET a metadata path and return the body as text.
    pub async fn get(&self, path: &str) -> FetchResult<String> {
        let url = format!("http://{}{path}", self.host);
        let resp = self
            .http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.request_error(path, e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.request_error(path, e))?;
        if !status.is_success() {
            return Err(FetchError::status(status.as_u16(), &text));
        }
        Ok(text)
    }

    fn request_error(&self, path: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            debug!(host = %self.host, %path, "metadata request timed out");
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Metadata(format!("{}: {e}", self.host))
        }
    }

    /// The GKE cluster this instance belongs to.
    pub async fn cluster_name(&self) -> FetchResult<String> {
        self.get(CLUSTER_NAME_PATH)
            .await
            .map(|name| name.trim().to_string())
    }

    /// Best-effort cluster-name discovery. Failures are logged and yield
    /// an empty name.
    pub async fn discover_cluster_name(&self) -> String {
        match self.cluster_name().await {
            Ok(name) => {
                debug!(cluster = %name, "discovered cluster name");
                name
            }
            Err(e) => {
                warn!(error = %e, "could not discover cluster name");
                String::new()
            }
        }
    }
}
