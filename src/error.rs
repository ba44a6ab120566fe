//! HTTP-facing error type.
//!
//! Service errors convert into `AppError`, which renders the JSON body
//! clients of the extraction API expect.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::job_store::JobError;
use crate::services::pipeline::PipelineError;
use crate::services::scheduler::SubmitError;
use crate::services::upload::UploadError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Job id that does not parse; treated like an unknown job
    #[error("Job not found")]
    NotFound(String),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) | AppError::Job(JobError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            AppError::Job(JobError::NotReady(_)) => (StatusCode::ACCEPTED, "NOT_READY"),
            AppError::Job(JobError::ProcessingFailed(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_FAILED")
            }
            AppError::Submit(SubmitError::QueueFull) => (StatusCode::SERVICE_UNAVAILABLE, "QUEUE_FULL"),
            AppError::Submit(SubmitError::ShuttingDown) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SHUTTING_DOWN")
            }
            AppError::Submit(SubmitError::Unreadable(_)) => (StatusCode::BAD_REQUEST, "UNREADABLE_VIDEO"),
            AppError::Upload(UploadError::UnsupportedType) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE")
            }
            AppError::Upload(UploadError::Io(..)) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            AppError::Upload(_) => (StatusCode::BAD_REQUEST, "INVALID_UPLOAD"),
            AppError::Pipeline(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_FAILED"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Upload(UploadError::Io(..)) => {
                tracing::error!(error = %self, "Upload storage error");
                "Failed to store upload".to_string()
            }
            AppError::Pipeline(e) => {
                tracing::error!(error = %e, "Inline extraction failed");
                "Processing failed".to_string()
            }
            AppError::Job(JobError::NotReady(_)) => "Not ready".to_string(),
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}
