//! Error types for the catalog client.

use crate::catalog::json::DecodeError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogApiError {
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Catalog returned HTTP {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },
    #[error("Failed to parse response")]
    ParseFailed {
        status: u16,
        url: String,
        #[source]
        source: DecodeError,
    },
    #[error(transparent)]
    RequestFailed(#[from] reqwest::Error),
}

impl CatalogApiError {
    /// Whether the request gave up because the per-request timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CatalogApiError::RequestFailed(e) if e.is_timeout())
    }
}
