use clap::Parser;
use dragy_extract::{
    config::AppConfig,
    models::job::SubmitOptions,
    services::{engine::ProcessEngine, pipeline, upload::VideoHandle},
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Run one local video through the extraction pipeline and print the result.
#[derive(Debug, Parser)]
#[command(name = "extract-once", version)]
struct Args {
    /// Video file to analyze (left in place)
    video: PathBuf,

    /// Vehicle type: car or motorcycle
    #[arg(long, default_value = "car")]
    vehicle_type: String,

    /// Requested range label, e.g. "0-100" or "100-200"
    #[arg(long)]
    range: Option<String>,

    /// Declared brand to validate against
    #[arg(long)]
    brand: Option<String>,

    /// Declared model year to validate against
    #[arg(long)]
    year: Option<String>,

    /// Engine executable tried before the configured fallbacks
    #[arg(long, env = "ENGINE_EXECUTABLE")]
    engine: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the result document.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    if args.engine.is_some() {
        config.engine_executable = args.engine.clone();
    }

    let engine = ProcessEngine::new(config.engine());
    let video = VideoHandle::existing(args.video.clone());
    if !video.is_readable().await {
        tracing::error!(video = %args.video.display(), "Video is not readable");
        return ExitCode::FAILURE;
    }

    let options = SubmitOptions {
        vehicle_type: Some(args.vehicle_type),
        range: args.range,
        declared_brand: args.brand,
        declared_year: args.year,
    };

    let result = match pipeline::process_video_guarded(&engine, &video, &options, None).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Extraction failed");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize result");
            return ExitCode::FAILURE;
        }
    }

    if result.summary.error.is_some() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}
