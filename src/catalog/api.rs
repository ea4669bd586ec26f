//! HTTP client for the TVMaze-style show index (`GET /shows?page=N`).

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::catalog::json::decode_json;
use crate::catalog::{CatalogApiError, CatalogSource, PageFetch};
use crate::data::models::ShowRecord;
use crate::utils::warn_if_slow;

const USER_AGENT: &str = concat!("showsync/", env!("CARGO_PKG_VERSION"));

/// Page fetches slower than this are logged.
const SLOW_FETCH_THRESHOLD: Duration = Duration::from_secs(5);

/// Client for the remote show catalog.
pub struct CatalogApi {
    http: reqwest::Client,
    base_url: Url,
}

impl CatalogApi {
    /// Build a client. `timeout` bounds every request end to end.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url).context("Failed to parse catalog base URL")?;
        // Url::join replaces the last path segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build catalog HTTP client")?;

        Ok(Self { http, base_url })
    }

    fn page_url(&self, page: u32) -> Result<Url, CatalogApiError> {
        let mut url = self.base_url.join("shows")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    /// Fetch one page of shows. `Ok(None)` means the page is past the end.
    pub async fn get_shows_page(
        &self,
        page: u32,
    ) -> Result<Option<Vec<ShowRecord>>, CatalogApiError> {
        let url = self.page_url(page)?;
        debug!(url = %url, page, "Fetching catalog page");

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CatalogApiError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let shows = decode_json::<Vec<ShowRecord>>(&body).map_err(|source| {
            CatalogApiError::ParseFailed {
                status: status.as_u16(),
                url: url.to_string(),
                source,
            }
        })?;

        Ok(Some(shows))
    }
}

#[async_trait]
impl CatalogSource for CatalogApi {
    async fn fetch_page(&self, page: u32) -> PageFetch {
        let start = Instant::now();
        let result = self.get_shows_page(page).await;
        warn_if_slow(start.elapsed(), SLOW_FETCH_THRESHOLD, "catalog page fetch");

        match result {
            Ok(Some(shows)) if !shows.is_empty() => {
                info!(page, count = shows.len(), "Fetched catalog page");
                PageFetch::Shows(shows)
            }
            Ok(_) => {
                debug!(page, "Catalog page past end of data");
                PageFetch::End
            }
            Err(e) => {
                match &e {
                    CatalogApiError::ParseFailed {
                        status,
                        url,
                        source,
                    } => {
                        error!(page, status, url, error = %source, "Failed to parse catalog page");
                    }
                    CatalogApiError::UnexpectedStatus { status, url } => {
                        warn!(page, status, url, "Catalog page request rejected");
                    }
                    other => {
                        warn!(page, timeout = other.is_timeout(), error = ?other, "Catalog page request failed");
                    }
                }
                PageFetch::Degraded(e)
            }
        }
    }
}
