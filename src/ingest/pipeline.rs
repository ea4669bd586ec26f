//! Incremental catalog ingestion.
//!
//! A run resumes from the page holding the highest stored show id, walks the
//! catalog page by page until a page yields nothing, and writes qualifying
//! shows in bounded batches. Each flush is one transaction.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogSource, PageFetch};
use crate::data::models::{Show, ShowRecord};
use crate::data::{ChangeSet, ShowStore};
use crate::ingest::genre_cache::GenreCache;
use crate::utils::fmt_duration;

/// Number of shows the catalog serves per page.
pub const PAGE_SIZE: i32 = 250;

/// Default maximum number of shows written per flush.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Shows premiering on or before this date are never ingested.
pub const PREMIERE_CUTOFF: NaiveDate = match NaiveDate::from_ymd_opt(2014, 1, 1) {
    Some(date) => date,
    None => panic!("invalid premiere cutoff"),
};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("An ingestion run is already in progress")]
    AlreadyRunning,
    #[error("Persistence failure during ingestion")]
    Persistence(#[source] anyhow::Error),
}

/// Counters describing one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub start_page: u32,
    pub pages_fetched: u32,
    /// Pages whose fetch failed and ended the run as if the catalog were exhausted.
    pub degraded_pages: u32,
    pub shows_seen: usize,
    pub shows_filtered: usize,
    pub shows_added: usize,
    pub shows_skipped_existing: usize,
    pub genres_created: usize,
    pub flushes: usize,
}

/// First page to fetch given the highest stored show id.
///
/// The page containing that id is fetched again, since it may have been only
/// partially stored.
pub fn resume_page(last_id: Option<i32>) -> u32 {
    match last_id {
        Some(id) if id >= 0 => (id / PAGE_SIZE) as u32,
        _ => 0,
    }
}

/// Whether a show with this premiere date qualifies for ingestion.
///
/// The cutoff is exclusive and undated shows never qualify.
pub fn passes_premiere_filter(premiered: Option<NaiveDate>) -> bool {
    premiered.is_some_and(|date| date > PREMIERE_CUTOFF)
}

/// Runs ingestion against a catalog and a store, one run at a time.
#[derive(Clone)]
pub struct Ingestor {
    catalog: Arc<dyn CatalogSource>,
    store: Arc<dyn ShowStore>,
    batch_size: usize,
    run_guard: Arc<Mutex<()>>,
}

impl Ingestor {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        store: Arc<dyn ShowStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            catalog,
            store,
            batch_size: batch_size.max(1),
            run_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Execute one full ingestion run.
    ///
    /// Returns [`IngestError::AlreadyRunning`] immediately if another run holds
    /// the guard. A failed flush aborts the run; earlier flushes stay committed.
    pub async fn run(&self) -> Result<IngestReport, IngestError> {
        let Ok(_guard) = self.run_guard.try_lock() else {
            warn!("Ingestion trigger rejected, a run is already in progress");
            return Err(IngestError::AlreadyRunning);
        };

        let start = Instant::now();
        info!("Ingestion run started");

        let run = IngestionRun {
            catalog: self.catalog.as_ref(),
            store: self.store.as_ref(),
            batch_size: self.batch_size,
            cache: GenreCache::load(self.store.as_ref())
                .await
                .map_err(IngestError::Persistence)?,
            batch: Vec::with_capacity(self.batch_size),
            report: IngestReport::default(),
        };

        match run.execute().await {
            Ok(report) => {
                info!(
                    duration = fmt_duration(start.elapsed()),
                    start_page = report.start_page,
                    pages_fetched = report.pages_fetched,
                    degraded_pages = report.degraded_pages,
                    shows_added = report.shows_added,
                    shows_filtered = report.shows_filtered,
                    shows_skipped_existing = report.shows_skipped_existing,
                    genres_created = report.genres_created,
                    flushes = report.flushes,
                    "Ingestion run completed"
                );
                Ok(report)
            }
            Err(e) => {
                error!(
                    duration = fmt_duration(start.elapsed()),
                    error = ?e,
                    "Ingestion run failed"
                );
                Err(e)
            }
        }
    }
}

/// State owned by a single run.
struct IngestionRun<'a> {
    catalog: &'a dyn CatalogSource,
    store: &'a dyn ShowStore,
    batch_size: usize,
    cache: GenreCache,
    batch: Vec<Show>,
    report: IngestReport,
}

impl IngestionRun<'_> {
    async fn execute(mut self) -> Result<IngestReport, IngestError> {
        let last = self
            .store
            .get_last()
            .await
            .map_err(IngestError::Persistence)?;
        let mut page = resume_page(last.map(|s| s.id));
        self.report.start_page = page;
        debug!(page, "Resuming ingestion");

        loop {
            let fetched = self.catalog.fetch_page(page).await;
            if let PageFetch::Degraded(e) = &fetched {
                // Treated as end of data; the run completes with what it has.
                warn!(page, error = %e, "Catalog page fetch degraded, ending run early");
                self.report.degraded_pages += 1;
            }

            let records = fetched.into_shows();
            if records.is_empty() {
                debug!(page, "Catalog exhausted");
                break;
            }

            self.report.pages_fetched += 1;
            info!(page, count = records.len(), "Processing catalog page");

            for record in records {
                self.accept(record);
                if self.batch.len() >= self.batch_size {
                    self.flush().await?;
                }
            }

            if !self.batch.is_empty() {
                self.flush().await?;
            }

            page += 1;
        }

        if !self.batch.is_empty() {
            self.flush().await?;
        }

        Ok(self.report)
    }

    /// Filter and map one record onto the pending batch.
    fn accept(&mut self, record: ShowRecord) {
        self.report.shows_seen += 1;

        if !passes_premiere_filter(record.premiered) {
            debug!(
                show_id = record.id,
                name = record.name.as_str(),
                premiered = ?record.premiered,
                "Skipping show premiering before cutoff"
            );
            self.report.shows_filtered += 1;
            return;
        }

        let genres = self.cache.resolve_all(record.genres.as_slice());
        self.batch.push(Show::from_record(record, genres));
    }

    /// Write the pending batch in one transaction, skipping ids already stored
    /// or already staged earlier in the same batch.
    async fn flush(&mut self) -> Result<(), IngestError> {
        let batch = std::mem::take(&mut self.batch);
        let pending = batch.len();
        let ids: Vec<i32> = batch.iter().map(|s| s.id).collect();
        let stored = self
            .store
            .existing_ids(&ids)
            .await
            .map_err(IngestError::Persistence)?;
        let mut changes = ChangeSet::new();

        for show in batch {
            if stored.contains(&show.id) || changes.contains_insert(show.id) {
                debug!(show_id = show.id, "Skipping show already stored");
                self.report.shows_skipped_existing += 1;
                continue;
            }
            changes.add(show);
        }

        let summary = self
            .store
            .commit(changes)
            .await
            .map_err(IngestError::Persistence)?;

        self.cache.absorb(&summary.created_genres);
        self.report.flushes += 1;
        self.report.shows_added += summary.inserted;
        self.report.genres_created += summary.created_genres.len();

        info!(
            pending,
            inserted = summary.inserted,
            genres_created = summary.created_genres.len(),
            "Flushed ingestion batch"
        );
        Ok(())
    }
}
