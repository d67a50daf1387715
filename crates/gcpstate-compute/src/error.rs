//! Error types for resource fetches.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for resource client operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while fetching resources or credentials.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("failed to obtain access token: {0}")]
    Auth(String),

    #[error("metadata server error: {0}")]
    Metadata(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    /// Build a `Status` error, keeping only the head of the body.
    pub(crate) fn status(status: u16, body: &str) -> Self {
        const MAX_BODY: usize = 256;
        let body = body.trim();
        let body = match body.char_indices().nth(MAX_BODY) {
            Some((idx, _)) => format!("{}…", &body[..idx]),
            None => body.to_string(),
        };
        Self::Status { status, body }
    }
}
