//! Health and status handlers.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::trace;

use crate::state::{AppState, ServiceStatus};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    name: String,
    status: ServiceStatus,
    seconds_since_change: u64,
}

#[derive(Serialize)]
pub struct StatusResponse {
    status: ServiceStatus,
    version: String,
    commit: String,
    services: BTreeMap<String, ServiceInfo>,
}

/// Health check endpoint
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Roll individual service statuses up into one.
fn overall_status<'a>(statuses: impl Iterator<Item = &'a ServiceStatus>) -> ServiceStatus {
    let statuses: Vec<&ServiceStatus> = statuses.collect();
    if statuses.is_empty() {
        ServiceStatus::Disabled
    } else if statuses.iter().any(|s| matches!(s, ServiceStatus::Error)) {
        ServiceStatus::Error
    } else if statuses.iter().any(|s| matches!(s, ServiceStatus::Starting)) {
        ServiceStatus::Starting
    } else {
        ServiceStatus::Active
    }
}

/// Status endpoint showing version and service statuses
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let services: BTreeMap<String, ServiceInfo> = state
        .service_statuses
        .snapshot()
        .into_iter()
        .map(|snap| {
            (
                snap.name.clone(),
                ServiceInfo {
                    name: snap.name,
                    status: snap.status,
                    seconds_since_change: snap.seconds_since_change,
                },
            )
        })
        .collect();

    Json(StatusResponse {
        status: overall_status(services.values().map(|s| &s.status)),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT_HASH").to_string(),
        services,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status_rollup() {
        assert_eq!(overall_status([].iter()), ServiceStatus::Disabled);
        assert_eq!(
            overall_status([ServiceStatus::Active, ServiceStatus::Error].iter()),
            ServiceStatus::Error
        );
        assert_eq!(
            overall_status([ServiceStatus::Active, ServiceStatus::Starting].iter()),
            ServiceStatus::Starting
        );
        assert_eq!(
            overall_status([ServiceStatus::Active].iter()),
            ServiceStatus::Active
        );
    }
}
