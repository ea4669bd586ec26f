//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use showsync::catalog::{CatalogApiError, CatalogSource, PageFetch};
use showsync::data::models::ShowRecord;
use tokio::sync::Semaphore;

/// What a scripted catalog returns for one page.
#[derive(Debug, Clone)]
pub enum ScriptedPage {
    Shows(Vec<ShowRecord>),
    /// Simulates an HTTP 500 from the catalog.
    Fail,
}

/// A catalog that serves pre-scripted pages and records every page requested.
///
/// Pages not in the script come back as `End`.
#[derive(Default)]
pub struct ScriptedCatalog {
    pages: HashMap<u32, ScriptedPage>,
    requested: Mutex<Vec<u32>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32, shows: Vec<ShowRecord>) -> Self {
        self.pages.insert(page, ScriptedPage::Shows(shows));
        self
    }

    pub fn failing_page(mut self, page: u32) -> Self {
        self.pages.insert(page, ScriptedPage::Fail);
        self
    }

    /// Block every fetch until the returned semaphore is given a permit.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogSource for ScriptedCatalog {
    async fn fetch_page(&self, page: u32) -> PageFetch {
        self.requested.lock().unwrap().push(page);
        let _permit = match &self.gate {
            Some(gate) => Some(gate.acquire().await.unwrap()),
            None => None,
        };

        match self.pages.get(&page) {
            Some(ScriptedPage::Shows(shows)) => PageFetch::Shows(shows.clone()),
            Some(ScriptedPage::Fail) => PageFetch::Degraded(CatalogApiError::UnexpectedStatus {
                status: 500,
                url: format!("https://catalog.test/shows?page={page}"),
            }),
            None => PageFetch::End,
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

/// A record that passes the premiere filter.
pub fn recent_show(id: i32, name: &str, genres: &[&str]) -> ShowRecord {
    ShowRecord {
        id,
        name: name.to_owned(),
        language: Some("English".to_owned()),
        premiered: date(2015, 6, 1),
        summary: Some(format!("<p>{name}</p>")),
        genres: genres.iter().map(|g| (*g).to_owned()).collect(),
    }
}

pub fn show_premiered(id: i32, premiered: Option<NaiveDate>) -> ShowRecord {
    ShowRecord {
        premiered,
        ..recent_show(id, &format!("Show {id}"), &[])
    }
}

/// `count` consecutive recent shows starting at `first_id`.
pub fn recent_shows(first_id: i32, count: i32) -> Vec<ShowRecord> {
    (first_id..first_id + count)
        .map(|id| recent_show(id, &format!("Show {id}"), &["Drama"]))
        .collect()
}
