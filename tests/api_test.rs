//! Integration tests for the extraction HTTP API.
//!
//! The engine is a shell script, so these tests need a unix `sh`.

#![cfg(unix)]

mod helpers;

use axum::http::StatusCode;
use dragy_extract::app_state::AppState;
use dragy_extract::routes;
use helpers::*;
use std::path::Path;

const SUPRA_JSON: &str = r#"{"brand": "Toyota", "year": 2020, "raw_text": "2020 Toyota Supra", "best_0_100_s": 9.8, "best_0_60_s": null, "best_100_200_s": null}"#;

fn setup(upload_dir: &Path, script: &Path) -> (axum::Router, AppState) {
    let config = config(upload_dir, script);
    let state = AppState::from_config(&config).expect("build state");
    (routes::api_router(state.clone(), config.max_upload_bytes), state)
}

fn video_upload(fields: &[(&str, &str)]) -> Vec<u8> {
    multipart_body(fields, Some(("video", "run.mp4", "video/mp4", b"fake video bytes")))
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let script = json_engine(dir.path(), SUPRA_JSON);
    let (app, _) = setup(&dir.path().join("uploads"), &script);

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["checks"]["scheduler"]["workers"], 2);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_async_job_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    let script = json_engine(dir.path(), SUPRA_JSON);
    let (app, _) = setup(&uploads, &script);

    let body = video_upload(&[
        ("vehicleType", "car"),
        ("range", "0-100"),
        ("providedBrand", "toyota"),
        ("providedYear", "2020"),
    ]);
    let (status, submitted) = send(&app, upload_request("/api/v1/dragy/async", body)).await;
    assert_eq!(status, StatusCode::ACCEPTED, "{submitted}");
    assert_eq!(submitted["success"], true);
    let job_id = submitted["jobId"].as_str().unwrap().to_string();

    let polls = poll_until_terminal(&app, &job_id).await;
    let last = polls.last().unwrap();
    assert_eq!(last["status"], "done");
    assert_eq!(last["percent"], 100);
    assert_eq!(last["id"], job_id.as_str());

    let (status, body) = get(&app, &format!("/api/v1/dragy/result/{job_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let result = &body["result"];
    assert_eq!(result["summary"]["range"], "0-100km/h");
    assert_eq!(result["summary"]["brand"], "Toyota");
    assert_eq!(result["summary"]["year"], 2020);
    assert_eq!(result["summary"]["best_elapsed_ms"], 9800);
    assert!(result["summary"]["error"].is_null());
    assert!(result["summary"]["model"].is_null());
    assert_eq!(result["validation"]["verdict"], "ok");
    assert_eq!(result["validation"]["reasons"], serde_json::json!([]));
    assert_eq!(result["detections"][0]["target_speed"], 100);
    assert_eq!(result["processor"], "python-easyocr");

    // Results of finished jobs are stable.
    let (_, again) = get(&app, &format!("/api/v1/dragy/result/{job_id}")).await;
    assert_eq!(body, again);

    // The uploaded video is gone once the job finished.
    assert_eq!(entries(&uploads), 0);

    let (_, deleted) = delete(&app, &format!("/api/v1/dragy/job/{job_id}")).await;
    assert_eq!(deleted["success"], true);
    let (_, deleted) = delete(&app, &format!("/api/v1/dragy/job/{job_id}")).await;
    assert_eq!(deleted["success"], false);

    let (status, body) = get(&app, &format!("/api/v1/dragy/progress/{job_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_brand_mismatch_is_reported_not_failed() {
    let dir = tempfile::tempdir().unwrap();
    let script = json_engine(dir.path(), r#"{"brand": "BMW", "year": 2019, "best_0_60_s": 4.2}"#);
    let (app, _) = setup(&dir.path().join("uploads"), &script);

    let body = video_upload(&[("vehicleType", "motorcycle"), ("providedBrand", "Audi"), ("providedYear", "2019")]);
    let (_, submitted) = send(&app, upload_request("/api/v1/dragy/async", body)).await;
    let job_id = submitted["jobId"].as_str().unwrap().to_string();
    poll_until_terminal(&app, &job_id).await;

    let (status, body) = get(&app, &format!("/api/v1/dragy/result/{job_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["summary"]["range"], "0-60mph");
    assert_eq!(body["result"]["validation"]["verdict"], "mismatch");
    assert_eq!(
        body["result"]["validation"]["reasons"],
        serde_json::json!(["brand-mismatch"])
    );
}

#[tokio::test]
async fn test_result_not_ready_while_processing() {
    let dir = tempfile::tempdir().unwrap();
    let script = engine_script(
        dir.path(),
        "slow.sh",
        &format!("sleep 1\ncat <<'JSON'\n{SUPRA_JSON}\nJSON"),
    );
    let (app, _) = setup(&dir.path().join("uploads"), &script);

    let (_, submitted) = send(&app, upload_request("/api/v1/dragy/async", video_upload(&[]))).await;
    let job_id = submitted["jobId"].as_str().unwrap().to_string();

    let (status, body) = get(&app, &format!("/api/v1/dragy/result/{job_id}")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not ready");

    let polls = poll_until_terminal(&app, &job_id).await;
    let percents: Vec<u64> = polls.iter().map(|p| p["percent"].as_u64().unwrap()).collect();
    assert!(
        percents.windows(2).all(|w| w[0] <= w[1]),
        "percent went backwards: {percents:?}"
    );
}

#[tokio::test]
async fn test_inline_processing_returns_result() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    let script = json_engine(dir.path(), r#"{"best_0_60_s": 4.0, "best_0_100_s": 9.8, "best_100_200_s": 14.2}"#);
    let (app, _) = setup(&uploads, &script);

    let body = multipart_body(
        &[("vehicleType", "car"), ("range", "100-200km/h")],
        Some(("file", "run.mov", "application/octet-stream", b"bytes")),
    );
    let (status, body) = send(&app, upload_request("/api/v1/dragy", body)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["result"]["summary"]["range"], "100-200km/h");
    assert_eq!(body["result"]["summary"]["best_elapsed_ms"], 14200);
    assert_eq!(entries(&uploads), 0);
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let script = json_engine(dir.path(), SUPRA_JSON);
    let (app, _) = setup(&dir.path().join("uploads"), &script);

    let (status, _) = get(&app, &format!("/api/v1/dragy/progress/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, "/api/v1/dragy/result/1712345678_abc").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let (_, body) = delete(&app, "/api/v1/dragy/job/not-a-job").await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_upload_rejections() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    let script = json_engine(dir.path(), SUPRA_JSON);
    let (app, state) = setup(&uploads, &script);

    let no_file = multipart_body(&[("vehicleType", "car")], None);
    let (status, body) = send(&app, upload_request("/api/v1/dragy/async", no_file)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No video uploaded");

    let image = multipart_body(&[], Some(("video", "label.png", "image/png", b"png")));
    let (status, _) = send(&app, upload_request("/api/v1/dragy/async", image)).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let empty = multipart_body(&[], Some(("video", "run.mp4", "video/mp4", b"")));
    let (status, _) = send(&app, upload_request("/api/v1/dragy/async", empty)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let long_brand = "x".repeat(300);
    let oversized = video_upload(&[("providedBrand", long_brand.as_str())]);
    let (status, body) = send(&app, upload_request("/api/v1/dragy/async", oversized)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_UPLOAD");

    assert!(state.store.is_empty());
    assert_eq!(entries(&uploads), 0);
}
