//! Request correlation IDs and per-request response logging.
//!
//! The ID comes from an incoming `x-request-id` header when it looks sane,
//! otherwise a fresh ULID. It is stored as a [`RequestId`] request extension,
//! opens the `request` span every handler log lands in, and is echoed back on
//! the response.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::Response;
use tower::{Layer, Service};
use tracing::Instrument;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_INCOMING_ID_LEN: usize = 128;

/// The resolved ID for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Reuse a caller-supplied ID if it is printable ASCII of reasonable length.
fn resolve_request_id(headers: &HeaderMap) -> RequestId {
    let incoming = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_INCOMING_ID_LEN);

    RequestId(match incoming {
        Some(id) => id.to_owned(),
        None => ulid::Ulid::new().to_string(),
    })
}

/// Successes at debug, client errors at info, everything else at warn.
fn log_response(method: &Method, path: &str, status: StatusCode, duration_ms: u64) {
    let status = status.as_u16();
    match status {
        200..=399 => tracing::debug!(%method, path, status, duration_ms, "Response"),
        400..=499 => tracing::info!(%method, path, status, duration_ms, "Response"),
        _ => tracing::warn!(%method, path, status, duration_ms, "Response"),
    }
}

#[derive(Clone)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let request_id = resolve_request_id(req.headers());
        let echo = HeaderValue::from_str(&request_id.0).ok();
        let span = tracing::info_span!("request", req_id = %request_id.0);

        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        req.extensions_mut().insert(request_id);

        let started = Instant::now();
        let future = self.inner.call(req);

        Box::pin(
            async move {
                let result = future.await;
                let duration_ms = started.elapsed().as_millis() as u64;

                match result {
                    Ok(mut response) => {
                        log_response(&method, &path, response.status(), duration_ms);
                        if let Some(value) = echo {
                            response.headers_mut().insert(REQUEST_ID_HEADER, value);
                        }
                        Ok(response)
                    }
                    Err(e) => {
                        tracing::error!(%method, path = %path, error = ?e, duration_ms, "Request failed");
                        Err(e)
                    }
                }
            }
            .instrument(span),
        )
    }
}
