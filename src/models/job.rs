use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::models::detection::ExtractionResult;

/// Status of an extraction job in the scheduler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    /// Done and failed jobs never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

/// Options supplied alongside an uploaded video.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubmitOptions {
    pub vehicle_type: Option<String>,
    pub range: Option<String>,
    pub declared_brand: Option<String>,
    pub declared_year: Option<String>,
}

/// One asynchronous extraction request and its tracked lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub percent: u8,
    pub stage: String,
    pub error: Option<String>,
    pub result: Option<ExtractionResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExtractionJob {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Queued,
            percent: 0,
            stage: "queued".to_string(),
            error: None,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn progress(&self) -> JobProgress {
        JobProgress {
            status: self.status,
            percent: self.percent,
            stage: self.stage.clone(),
        }
    }
}

impl Default for ExtractionJob {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a job returned to pollers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobProgress {
    pub status: JobStatus,
    pub percent: u8,
    pub stage: String,
}

/// A staged progress update emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub percent: u8,
    pub stage: &'static str,
}
