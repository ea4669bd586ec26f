//! Show CRUD and ingestion trigger handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, info, instrument};

use crate::data::models::{ShowRecord, ShowUpdate};
use crate::ingest::{IngestError, IngestReport};
use crate::state::{AppState, SERVICE_INGEST, ServiceStatus};
use crate::web::error::ApiError;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub message: String,
    pub report: IngestReport,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
}

fn default_list_limit() -> i64 {
    DEFAULT_LIST_LIMIT
}

/// `GET /api/shows/fetch`: run one ingestion pass and wait for it.
///
/// The run is spawned, so it finishes even if the client disconnects or the
/// request times out.
#[instrument(skip_all)]
pub async fn fetch_shows(State(state): State<AppState>) -> Result<Json<FetchResponse>, ApiError> {
    info!("Ingestion triggered over HTTP");
    let ingestor = state.ingestor.clone();
    let statuses = state.service_statuses.clone();
    let run = tokio::spawn(
        async move {
            let outcome = ingestor.run().await;
            match &outcome {
                Ok(_) => statuses.set(SERVICE_INGEST, ServiceStatus::Active),
                Err(IngestError::AlreadyRunning) => {}
                Err(_) => statuses.set(SERVICE_INGEST, ServiceStatus::Error),
            }
            outcome
        }
        .in_current_span(),
    );

    let report = run
        .await
        .map_err(|e| ApiError::internal("Ingestion task", &anyhow::Error::new(e)))??;

    Ok(Json(FetchResponse {
        message: "Shows fetched successfully".to_string(),
        report,
    }))
}

/// `POST /api/shows`
#[instrument(skip_all)]
pub async fn add_show(
    State(state): State<AppState>,
    Json(record): Json<ShowRecord>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    state.shows.add(record).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Show added successfully".to_string(),
        }),
    ))
}

/// `PUT /api/shows/{id}`
#[instrument(skip_all, fields(show_id = id))]
pub async fn update_show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<ShowUpdate>,
) -> Result<StatusCode, ApiError> {
    state.shows.update(id, body.into_record(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/shows/{id}`
#[instrument(skip_all, fields(show_id = id))]
pub async fn delete_show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.shows.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/shows/{id}`
pub async fn get_show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ShowRecord>, ApiError> {
    Ok(Json(state.shows.get(id).await?))
}

/// `GET /api/shows?offset=&limit=`
pub async fn list_shows(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ShowRecord>>, ApiError> {
    let offset = params.offset.max(0);
    let limit = params.limit.clamp(1, MAX_LIST_LIMIT);
    Ok(Json(state.shows.list(offset, limit).await?))
}
