use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub scheduler: SchedulerHealth,
    pub store: StoreHealth,
}

#[derive(Serialize)]
pub struct SchedulerHealth {
    pub status: String,
    pub workers: usize,
    pub queue_depth: usize,
    pub queue_capacity: usize,
}

#[derive(Serialize)]
pub struct StoreHealth {
    pub jobs: usize,
}

/// GET /health — service status with scheduler load.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let accepting = state.scheduler.is_accepting();
    let config = state.scheduler.config();

    let scheduler = SchedulerHealth {
        status: if accepting { "ok" } else { "stopped" }.to_string(),
        workers: config.worker_count,
        queue_depth: state.scheduler.queue_depth(),
        queue_capacity: config.queue_capacity,
    };

    let status_code = if accepting {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if accepting { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            scheduler,
            store: StoreHealth {
                jobs: state.store.len(),
            },
        },
    };

    (status_code, Json(response))
}
