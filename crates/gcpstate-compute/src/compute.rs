//! Compute Engine REST client.
//!
//! Lists regional URL maps and forwarding rules through the plain JSON
//! API, following `nextPageToken` until the collection is exhausted.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use gcpstate_state::{ForwardingRule, ProjectScope, UrlMap};

use crate::auth::TokenSource;
use crate::client::{BoxFuture, ResourceClient, http_client};
use crate::error::{FetchError, FetchResult};

/// Public Compute Engine API endpoint.
pub const DEFAULT_COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com";

const URL_MAPS: &str = "urlMaps";
const FORWARDING_RULES: &str = "forwardingRules";

/// One page of a Compute Engine list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Resource client backed by the Compute Engine v1 REST API.
#[derive(Debug)]
pub struct ComputeClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: TokenSource,
}

impl ComputeClient {
    pub fn new(endpoint: impl Into<String>, tokens: TokenSource) -> FetchResult<Self> {
        Ok(Self {
            http: http_client()?,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn collection_url(&self, scope: &ProjectScope, collection: &str) -> String {
        format!(
            "{}/compute/v1/projects/{}/regions/{}/{collection}",
            self.endpoint, scope.project, scope.region
        )
    }

    /// Fetch every page of a regional collection.
    async fn list_all<T: DeserializeOwned>(
        &self,
        scope: &ProjectScope,
        collection: &str,
    ) -> FetchResult<Vec<T>> {
        let url = self.collection_url(scope, collection);
        let token = self.tokens.token().await?;
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self.http.get(&url).bearer_auth(&token);
            if let Some(ref page) = page_token {
                req = req.query(&[("pageToken", page.as_str())]);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| FetchError::Http(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(FetchError::status(status.as_u16(), &body));
            }

            let page: ListPage<T> = resp
                .json()
                .await
                .map_err(|e| FetchError::Decode(e.to_string()))?;
            items.extend(page.items);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(%scope, collection, count = items.len(), "listed collection");
        Ok(items)
    }
}

impl ResourceClient for ComputeClient {
    fn list_url_maps<'a>(
        &'a self,
        scope: &'a ProjectScope,
    ) -> BoxFuture<'a, FetchResult<Vec<UrlMap>>> {
        Box::pin(self.list_all(scope, URL_MAPS))
    }

    fn list_forwarding_rules<'a>(
        &'a self,
        scope: &'a ProjectScope,
    ) -> BoxFuture<'a, FetchResult<Vec<ForwardingRule>>> {
        Box::pin(self.list_all(scope, FORWARDING_RULES))
    }
}
