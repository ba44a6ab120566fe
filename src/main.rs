use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use dragy_extract::app_state::AppState;
use dragy_extract::config::AppConfig;
use dragy_extract::routes::{self, metrics::MetricsState};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing dragy-extract server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_histogram!(
        "extraction_processing_seconds",
        "Time to process one extraction job"
    );
    metrics::describe_histogram!(
        "engine_invocation_seconds",
        "Wall-clock time of a single engine run"
    );
    metrics::describe_counter!(
        "extraction_jobs_submitted_total",
        "Total extraction jobs accepted"
    );
    metrics::describe_counter!(
        "extraction_jobs_completed_total",
        "Total extraction jobs that reached done"
    );
    metrics::describe_counter!(
        "extraction_jobs_failed_total",
        "Total extraction jobs that failed in orchestration"
    );
    metrics::describe_counter!(
        "extraction_jobs_rejected_total",
        "Submissions rejected because the queue was full or closed"
    );
    metrics::describe_counter!(
        "extraction_jobs_evicted_total",
        "Finished jobs evicted from the store"
    );
    metrics::describe_gauge!(
        "extraction_queue_depth",
        "Current number of jobs waiting for a worker"
    );

    let engine = config.engine();
    tracing::info!(
        engine = %engine.name,
        candidates = ?engine.candidates,
        script = ?engine.script,
        timeout_secs = engine.timeout.as_secs(),
        "Configured extraction engine"
    );

    // Job store, worker pool and upload directory
    tracing::info!(upload_dir = %config.upload_dir.display(), "Starting extraction scheduler");
    let state = AppState::from_config(&config).expect("Failed to initialize job pipeline");
    let sweeper = state.store.start_sweeper();

    let metrics_state = MetricsState {
        handle: prometheus_handle,
        scheduler: Arc::clone(&state.scheduler),
    };
    let scheduler = Arc::clone(&state.scheduler);

    let app = Router::new()
        .merge(routes::api_router(state, config.max_upload_bytes))
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(metrics_state),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting dragy-extract on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    sweeper.abort();
    scheduler.shutdown().await;
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
