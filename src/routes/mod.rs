use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::app_state::AppState;

pub mod health;
pub mod jobs;
pub mod metrics;

/// Extraction API and health check. `/metrics` is mounted by the binary since
/// it needs the process-wide recorder.
pub fn api_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/dragy", post(jobs::process_inline))
        .route("/api/v1/dragy/async", post(jobs::submit_async))
        .route("/api/v1/dragy/progress/{id}", get(jobs::get_progress))
        .route("/api/v1/dragy/result/{id}", get(jobs::get_result))
        .route("/api/v1/dragy/job/{id}", delete(jobs::delete_job))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
}
