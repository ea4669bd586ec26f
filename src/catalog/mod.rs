//! Client and source abstraction for the external show catalog.

pub mod api;
pub mod errors;
pub mod json;

pub use api::CatalogApi;
pub use errors::CatalogApiError;

use async_trait::async_trait;

use crate::data::models::ShowRecord;

/// Result of fetching one catalog page.
///
/// `End` and `Degraded` both mean "no records this page" to the ingestion
/// pipeline. They are kept apart so a failed fetch can be logged and counted
/// instead of passing silently as end-of-data.
#[derive(Debug)]
pub enum PageFetch {
    Shows(Vec<ShowRecord>),
    /// The page is past the last one, or came back empty.
    End,
    /// The fetch failed at the transport level, returned an unexpected
    /// status, or could not be decoded.
    Degraded(CatalogApiError),
}

impl PageFetch {
    /// Fold the outcome into the plain "sequence of records" view.
    pub fn into_shows(self) -> Vec<ShowRecord> {
        match self {
            PageFetch::Shows(shows) => shows,
            PageFetch::End | PageFetch::Degraded(_) => Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, PageFetch::Degraded(_))
    }
}

/// A paginated source of raw show records.
///
/// Implementations never fail the caller and never retry.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_page(&self, page: u32) -> PageFetch;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_folds_to_no_records() {
        let degraded = PageFetch::Degraded(CatalogApiError::UnexpectedStatus {
            status: 503,
            url: "https://api.tvmaze.com/shows?page=9".into(),
        });
        assert!(degraded.is_degraded());
        assert!(degraded.into_shows().is_empty());

        assert!(!PageFetch::End.is_degraded());
        assert!(PageFetch::End.into_shows().is_empty());
    }
}
