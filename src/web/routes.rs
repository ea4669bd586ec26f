//! Web API router construction.

use axum::{
    Router,
    routing::{get, put},
};
use std::time::Duration;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

use crate::state::AppState;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::{shows, status};

/// Ingestion runs synchronously inside the request, so the timeout has to
/// cover a full catalog walk.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/shows", get(shows::list_shows).post(shows::add_show))
        .route("/shows/fetch", get(shows::fetch_shows))
        .route(
            "/shows/{id}",
            put(shows::update_show)
                .delete(shows::delete_show)
                .get(shows::get_show),
        )
        .with_state(app_state);

    Router::new().nest("/api", api_router).layer((
        // Outermost: request ID span and response logging.
        RequestIdLayer,
        CompressionLayer::new()
            .zstd(true)
            .br(true)
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        TimeoutLayer::new(REQUEST_TIMEOUT),
    ))
}
