use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

use crate::models::detection::{ExtractionResult, Summary, VehicleType, PROCESSOR_NAME};
use crate::models::job::{ProgressEvent, SubmitOptions};
use crate::models::validation::DeclaredVehicle;
use crate::services::engine::Extractor;
use crate::services::upload::VideoHandle;
use crate::services::{normalizer, validation};

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

fn report(progress: Option<&ProgressSender>, percent: u8, stage: &'static str) {
    if let Some(tx) = progress {
        // A closed receiver only means nobody is watching any more.
        let _ = tx.send(ProgressEvent { percent: percent.min(100), stage });
    }
}

/// Run one video through engine, normalizer and validator.
///
/// Extraction problems never escape as errors: a missing engine, unusable
/// output, or an engine-reported failure all produce a result whose summary
/// carries the message, so the caller always ends up with an inspectable
/// document.
pub async fn process_video(
    extractor: &dyn Extractor,
    video: &VideoHandle,
    options: &SubmitOptions,
    progress: Option<&ProgressSender>,
) -> ExtractionResult {
    let video_info = video.info().await;
    let requested_range = options.range.as_deref().unwrap_or("");
    let vehicle = VehicleType::parse_lenient(options.vehicle_type.as_deref());

    report(progress, 5, "engine-start");
    report(progress, 15, "prepare");

    let failed = |message: String| {
        report(progress, 100, "failed");
        ExtractionResult {
            processor: PROCESSOR_NAME.to_string(),
            video: video_info.clone(),
            detections: Vec::new(),
            summary: Summary::failed(options.range.as_deref(), message),
            validation: None,
        }
    };

    let mut result = match extractor.extract(video.path()).await {
        Err(e) => {
            tracing::warn!(video = %video.filename(), error = %e, "Engine invocation failed");
            failed(e.to_string())
        }
        Ok(raw) => {
            report(progress, 60, "ocr");
            match raw.error.clone() {
                Some(engine_error) => {
                    tracing::warn!(video = %video.filename(), error = %engine_error, "Engine reported an error");
                    failed(engine_error)
                }
                None => {
                    report(progress, 75, "parsing");
                    let detection = normalizer::normalize(&raw, vehicle, requested_range);
                    let summary = normalizer::summarize(&detection);

                    tracing::info!(
                        video = %video.filename(),
                        range = %detection.range,
                        elapsed_ms = ?detection.elapsed_ms,
                        brand = ?detection.brand,
                        year = ?detection.year,
                        "Measurement normalized"
                    );

                    if summary.error.is_some() {
                        report(progress, 100, "failed");
                    } else {
                        report(progress, 100, "done");
                    }

                    ExtractionResult {
                        processor: PROCESSOR_NAME.to_string(),
                        video: video_info.clone(),
                        detections: vec![detection],
                        summary,
                        validation: None,
                    }
                }
            }
        }
    };

    let declared = DeclaredVehicle {
        brand: options.declared_brand.clone(),
        year: options.declared_year.clone(),
    };
    let verdict = validation::validate(Some(&result.summary), &declared);
    tracing::debug!(verdict = %verdict.verdict, reasons = ?verdict.reasons, "Validation complete");
    result.validation = Some(verdict);

    result
}

/// Run the pipeline, converting a panic inside it into an orchestration fault.
pub async fn process_video_guarded(
    extractor: &dyn Extractor,
    video: &VideoHandle,
    options: &SubmitOptions,
    progress: Option<&ProgressSender>,
) -> Result<ExtractionResult, PipelineError> {
    AssertUnwindSafe(process_video(extractor, video, options, progress))
        .catch_unwind()
        .await
        .map_err(|payload| PipelineError::Panicked(panic_message(payload.as_ref())))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Processing failed".to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Processing failed: {0}")]
    Panicked(String),
}
