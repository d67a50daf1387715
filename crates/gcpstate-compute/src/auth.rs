//! Access tokens for the Compute Engine API.
//!
//! Sources are resolved like application default credentials: an explicit
//! key file, then the gcloud well-known file, then the metadata server.
//! Every source except a fixed token is cached and refreshed shortly
//! before it expires.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::client::http_client;
use crate::credentials::{Credentials, well_known_file};
use crate::error::{FetchError, FetchResult};
use crate::metadata::{MetadataClient, TOKEN_PATH};

/// Tokens are refreshed this long before the server-side expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Where bearer tokens come from.
pub enum TokenSource {
    /// A fixed token supplied through configuration. Never refreshed.
    Static(String),
    /// A provider whose tokens are cached until shortly before expiry.
    Refreshing(RefreshingTokens),
}

impl TokenSource {
    /// The instance's default service account, via the metadata server.
    pub fn metadata(client: MetadataClient) -> Self {
        Self::Refreshing(RefreshingTokens::new(TokenProvider::Metadata(client)))
    }

    /// Tokens exchanged from a service-account key or gcloud user credentials.
    pub fn credentials(credentials: Credentials) -> FetchResult<Self> {
        let http = http_client()?;
        Ok(Self::Refreshing(RefreshingTokens::new(
            TokenProvider::Credentials { credentials, http },
        )))
    }

    /// Application default credentials: `credentials_file` if given, else
    /// the gcloud well-known file if present, else the metadata server.
    pub fn application_default(
        credentials_file: Option<&Path>,
        metadata: MetadataClient,
    ) -> FetchResult<Self> {
        let well_known = well_known_file(|name| std::env::var(name).ok()).filter(|p| p.is_file());
        Self::resolve(credentials_file, well_known, metadata)
    }

    fn resolve(
        credentials_file: Option<&Path>,
        well_known: Option<PathBuf>,
        metadata: MetadataClient,
    ) -> FetchResult<Self> {
        let path = credentials_file.map(Path::to_path_buf).or(well_known);
        match path {
            Some(path) => {
                let credentials = Credentials::from_file(&path)?;
                info!(
                    path = %path.display(),
                    principal = credentials.principal(),
                    "using credentials file"
                );
                Self::credentials(credentials)
            }
            None => {
                info!(host = metadata.host(), "using metadata server credentials");
                Ok(Self::metadata(metadata))
            }
        }
    }

    /// A bearer token valid for at least the next few seconds.
    pub async fn token(&self) -> FetchResult<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Refreshing(tokens) => tokens.token(Instant::now()).await,
        }
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("TokenSource::Static(..)"),
            Self::Refreshing(tokens) => match &tokens.provider {
                TokenProvider::Metadata(client) => {
                    write!(f, "TokenSource::Metadata({})", client.host())
                }
                TokenProvider::Credentials { credentials, .. } => {
                    write!(f, "TokenSource::Credentials({})", credentials.principal())
                }
            },
        }
    }
}

/// OAuth token response, from the metadata server or a token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

impl CachedToken {
    fn from_response(resp: TokenResponse, now: Instant) -> Self {
        let lifetime = Duration::from_secs(resp.expires_in).saturating_sub(EXPIRY_MARGIN);
        Self {
            token: resp.access_token,
            refresh_at: now + lifetime,
        }
    }

    fn is_valid(&self, now: Instant) -> bool {
        now < self.refresh_at
    }
}

enum TokenProvider {
    Metadata(MetadataClient),
    Credentials {
        credentials: Credentials,
        http: reqwest::Client,
    },
}

impl TokenProvider {
    async fn fetch(&self) -> FetchResult<TokenResponse> {
        match self {
            Self::Metadata(client) => {
                let body = client
                    .get(TOKEN_PATH)
                    .await
                    .map_err(|e| FetchError::Auth(e.to_string()))?;
                serde_json::from_str(&body).map_err(|e| FetchError::Auth(e.to_string()))
            }
            Self::Credentials { credentials, http } => credentials.exchange(http).await,
        }
    }
}

/// Caching token fetcher.
pub struct RefreshingTokens {
    provider: TokenProvider,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshingTokens {
    fn new(provider: TokenProvider) -> Self {
        Self {
            provider,
            cached: Mutex::new(None),
        }
    }

    async fn token(&self, now: Instant) -> FetchResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_valid(now)) {
            return Ok(token.token.clone());
        }

        let resp = self.provider.fetch().await?;
        debug!(expires_in = resp.expires_in, "access token refreshed");

        let fresh = CachedToken::from_response(resp, now);
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
