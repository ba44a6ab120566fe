//! Test helper utilities: fake engines, multipart bodies and polling.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use dragy_extract::config::AppConfig;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tower::ServiceExt;

pub const BOUNDARY: &str = "dragy-test-boundary";

/// Write a shell script that stands in for the analysis engine.
///
/// The script is run as `sh <script> <video>`, so it never needs to be executable.
pub fn engine_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write engine script");
    path
}

/// Engine that prints a fixed JSON document.
pub fn json_engine(dir: &Path, json: &str) -> PathBuf {
    engine_script(dir, "engine.sh", &format!("cat <<'JSON'\n{json}\nJSON"))
}

/// Configuration running `sh <script>` with uploads under `upload_dir`.
pub fn config(upload_dir: &Path, script: &Path) -> AppConfig {
    AppConfig {
        engine_executable: None,
        engine_fallbacks: vec!["sh".to_string()],
        engine_script: Some(script.to_path_buf()),
        engine_timeout_secs: 10,
        upload_dir: upload_dir.to_path_buf(),
        ..AppConfig::default()
    }
}

/// Build a multipart/form-data body with text fields and an optional file.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    if let Some((field, filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

/// Send a request to the router and decode the JSON response.
pub async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn delete(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

/// Poll the progress endpoint until the job is done or failed, returning every observation.
pub async fn poll_until_terminal(app: &axum::Router, job_id: &str) -> Vec<Value> {
    let mut seen = Vec::new();
    for _ in 0..500 {
        let (status, body) = get(app, &format!("/api/v1/dragy/progress/{job_id}")).await;
        assert_eq!(status, StatusCode::OK, "progress poll failed: {body}");
        let state = body["status"].as_str().unwrap_or_default().to_string();
        seen.push(body);
        if state == "done" || state == "failed" {
            return seen;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish");
}

/// Number of entries left in a directory.
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
