//! JSON error responses for the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::error;

use crate::ingest::IngestError;
use crate::services::ShowServiceError;

/// Generic message returned for unexpected failures; the cause goes in `details`.
const INTERNAL_MESSAGE: &str = "An error occurred";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// 500 with the full error chain as details.
    pub fn internal(context: &str, err: &anyhow::Error) -> Self {
        error!(error = ?err, "{context} failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                message: INTERNAL_MESSAGE.to_string(),
                details: Some(format!("{err:#}")),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ShowServiceError> for ApiError {
    fn from(err: ShowServiceError) -> Self {
        match err {
            ShowServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            ShowServiceError::Conflict { .. } => ApiError::conflict(err.to_string()),
            ShowServiceError::Persistence(e) => ApiError::internal("Show operation", &e),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::AlreadyRunning => ApiError::conflict(err.to_string()),
            IngestError::Persistence(_) => {
                ApiError::internal("Ingestion", &anyhow::Error::new(err))
            }
        }
    }
}
