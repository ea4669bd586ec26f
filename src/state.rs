//! Application state shared across the web layer and background tasks.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::catalog::CatalogSource;
use crate::data::ShowStore;
use crate::ingest::Ingestor;
use crate::services::ShowService;

/// Health status of a service.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Starting,
    Active,
    Disabled,
    Error,
}

#[derive(Debug, Clone, Copy)]
struct StatusEntry {
    status: ServiceStatus,
    updated_at: Instant,
}

/// Point-in-time view of one service's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSnapshot {
    pub name: String,
    pub status: ServiceStatus,
    pub seconds_since_change: u64,
}

/// Shared registry the web server and ingestion runs report their health into.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatusRegistry {
    inner: Arc<DashMap<String, StatusEntry>>,
}

impl ServiceStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `status` for `name`, resetting its change timer.
    pub fn set(&self, name: &str, status: ServiceStatus) {
        self.inner.insert(
            name.to_owned(),
            StatusEntry {
                status,
                updated_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<ServiceStatus> {
        self.inner.get(name).map(|entry| entry.status)
    }

    /// Snapshot of every registered service, sorted by name.
    pub fn snapshot(&self) -> Vec<ServiceSnapshot> {
        let mut services: Vec<ServiceSnapshot> = self
            .inner
            .iter()
            .map(|entry| ServiceSnapshot {
                name: entry.key().clone(),
                status: entry.status,
                seconds_since_change: entry.updated_at.elapsed().as_secs(),
            })
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        services
    }
}

/// Service names used in the status registry.
pub const SERVICE_WEB: &str = "web";
pub const SERVICE_INGEST: &str = "ingest";

#[derive(Clone)]
pub struct AppState {
    pub shows: ShowService,
    pub ingestor: Ingestor,
    pub service_statuses: ServiceStatusRegistry,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        store: Arc<dyn ShowStore>,
        batch_size: usize,
    ) -> Self {
        let service_statuses = ServiceStatusRegistry::new();
        service_statuses.set(SERVICE_INGEST, ServiceStatus::Active);
        Self {
            shows: ShowService::new(store.clone()),
            ingestor: Ingestor::new(catalog, store, batch_size),
            service_statuses,
        }
    }
}
