use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::models::api::{DeleteResponse, ProgressResponse, ResultResponse, SubmitForm, SubmitResponse};
use crate::services::pipeline;
use crate::services::upload::{is_accepted_video, UploadError, VideoHandle};

const FILE_FIELDS: &[&str] = &["video", "file"];

fn malformed(e: axum::extract::multipart::MultipartError) -> UploadError {
    UploadError::Malformed(e.body_text())
}

/// Stream the uploaded video to a temporary file and collect the text fields.
async fn read_upload(state: &AppState, mut multipart: Multipart) -> Result<(VideoHandle, SubmitForm), AppError> {
    let mut video: Option<VideoHandle> = None;
    let mut form = SubmitForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        if FILE_FIELDS.contains(&name.as_str()) || field.file_name().is_some() {
            if video.is_some() {
                // Only the first file is processed.
                continue;
            }
            if !is_accepted_video(field.content_type(), field.file_name()) {
                return Err(UploadError::UnsupportedType.into());
            }

            let (handle, mut file) = state.uploads.create(field.file_name())?;
            let io_err = |e| UploadError::Io(handle.path().display().to_string(), e);

            let mut written = 0u64;
            while let Some(chunk) = field.chunk().await.map_err(malformed)? {
                file.write_all(&chunk).await.map_err(io_err)?;
                written += chunk.len() as u64;
            }
            file.flush().await.map_err(io_err)?;

            if written == 0 {
                return Err(UploadError::Empty.into());
            }
            tracing::debug!(file = %handle.filename(), bytes = written, "Stored uploaded video");
            video = Some(handle);
        } else {
            let value = field.text().await.map_err(malformed)?;
            form.set_field(&name, value);
        }
    }

    form.validate()
        .map_err(|report| UploadError::InvalidFields(report.to_string()))?;
    let video = video.ok_or(UploadError::Missing)?;
    Ok((video, form))
}

fn parse_job_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(raw.to_string()))
}

/// POST /api/v1/dragy/async — Upload a video and start a background extraction.
pub async fn submit_async(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let (video, form) = read_upload(&state, multipart).await?;
    let job_id = state.scheduler.submit(video, form.into_options()).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            success: true,
            job_id,
        }),
    ))
}

/// POST /api/v1/dragy — Upload a video and wait for the extraction result.
pub async fn process_inline(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ResultResponse>, AppError> {
    let (video, form) = read_upload(&state, multipart).await?;
    let options = form.into_options();

    tracing::info!(video = %video.filename(), "Processing upload inline");
    let outcome = pipeline::process_video_guarded(state.extractor.as_ref(), &video, &options, None).await;

    if let Err(e) = video.release() {
        tracing::warn!(error = %e, "Failed to remove uploaded video");
    }

    Ok(Json(ResultResponse {
        success: true,
        result: outcome?,
    }))
}

/// GET /api/v1/dragy/progress/{id} — Poll job progress.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProgressResponse>, AppError> {
    let id = parse_job_id(&id)?;
    let progress = state.store.progress(id)?;

    Ok(Json(ProgressResponse {
        success: true,
        id,
        status: progress.status,
        percent: progress.percent,
        stage: progress.stage,
    }))
}

/// GET /api/v1/dragy/result/{id} — Fetch the result of a finished job.
pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResultResponse>, AppError> {
    let id = parse_job_id(&id)?;
    let result = state.store.result(id)?;

    Ok(Json(ResultResponse { success: true, result }))
}

/// DELETE /api/v1/dragy/job/{id} — Forget a job. Running extractions are not interrupted.
pub async fn delete_job(State(state): State<AppState>, Path(id): Path<String>) -> Json<DeleteResponse> {
    let existed = Uuid::parse_str(&id)
        .map(|id| state.store.delete(id))
        .unwrap_or(false);
    Json(DeleteResponse { success: existed })
}
