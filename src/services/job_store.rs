use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::detection::ExtractionResult;
use crate::models::job::{ExtractionJob, JobProgress, JobStatus, ProgressEvent};

/// Retention policy for finished jobs.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Finished jobs older than this are evicted by the sweeper.
    pub ttl: Duration,
    /// Soft cap; the oldest finished jobs make room for new ones.
    pub max_jobs: usize,
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_jobs: 1000,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// In-memory registry of extraction jobs.
///
/// Every record is read and written under the map lock, so pollers always see
/// a whole record. Only the worker running a job writes to it.
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, ExtractionJob>>,
    config: StoreConfig,
}

impl JobStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            config,
        }
    }

    // Records are plain data assigned field by field, so a poisoned lock
    // still guards a usable map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, ExtractionJob>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, ExtractionJob>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new queued job and return its id.
    pub fn create(&self) -> Uuid {
        let job = ExtractionJob::new();
        let id = job.id;

        let mut jobs = self.write();
        if jobs.len() >= self.config.max_jobs {
            let excess = jobs.len() + 1 - self.config.max_jobs;
            let evicted = evict_oldest_finished(&mut jobs, excess);
            if evicted > 0 {
                metrics::counter!("extraction_jobs_evicted_total").increment(evicted as u64);
                tracing::info!(evicted, "Evicted finished jobs to stay within capacity");
            }
        }
        jobs.insert(id, job);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<ExtractionJob> {
        self.read().get(&id).cloned()
    }

    pub fn progress(&self, id: Uuid) -> Result<JobProgress, JobError> {
        self.read()
            .get(&id)
            .map(ExtractionJob::progress)
            .ok_or(JobError::NotFound(id))
    }

    pub fn result(&self, id: Uuid) -> Result<ExtractionResult, JobError> {
        let jobs = self.read();
        let job = jobs.get(&id).ok_or(JobError::NotFound(id))?;
        match job.status {
            JobStatus::Done => job
                .result
                .clone()
                .ok_or_else(|| JobError::ProcessingFailed("Result missing".to_string())),
            JobStatus::Failed => Err(JobError::ProcessingFailed(
                job.error.clone().unwrap_or_else(|| "Processing failed".to_string()),
            )),
            status => Err(JobError::NotReady(status)),
        }
    }

    /// Move a queued job to processing. False when the job is gone or already started.
    pub fn mark_processing(&self, id: Uuid) -> bool {
        self.update(id, |job| {
            if job.status != JobStatus::Queued {
                return false;
            }
            job.status = JobStatus::Processing;
            job.stage = "processing".to_string();
            true
        })
        .unwrap_or(false)
    }

    /// Apply a progress event; percent never moves backwards and finished jobs are left alone.
    pub fn record_progress(&self, id: Uuid, event: &ProgressEvent) {
        self.update(id, |job| {
            if job.status.is_terminal() || event.percent < job.percent {
                return;
            }
            job.percent = event.percent.min(100);
            job.stage = event.stage.to_string();
        });
    }

    pub fn complete(&self, id: Uuid, result: ExtractionResult) -> bool {
        self.update(id, |job| {
            if job.status.is_terminal() {
                return false;
            }
            job.status = JobStatus::Done;
            job.percent = 100;
            if job.stage != "failed" {
                job.stage = "done".to_string();
            }
            job.error = None;
            job.result = Some(result);
            true
        })
        .unwrap_or(false)
    }

    pub fn fail(&self, id: Uuid, error: impl Into<String>) -> bool {
        let error = error.into();
        self.update(id, |job| {
            if job.status.is_terminal() {
                return false;
            }
            job.status = JobStatus::Failed;
            job.stage = "failed".to_string();
            job.error = Some(error);
            job.result = None;
            true
        })
        .unwrap_or(false)
    }

    /// Remove a job. Returns whether it existed.
    pub fn delete(&self, id: Uuid) -> bool {
        self.write().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drop finished jobs older than the configured TTL.
    pub fn evict_expired(&self) -> usize {
        let ttl = chrono::Duration::from_std(self.config.ttl).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now().checked_sub_signed(ttl);
        let Some(cutoff) = cutoff else {
            return 0;
        };

        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, job| !(job.status.is_terminal() && job.updated_at < cutoff));
        before - jobs.len()
    }

    /// Spawn the periodic TTL sweeper.
    pub fn start_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!(
                ttl_secs = store.config.ttl.as_secs(),
                interval_secs = store.config.sweep_interval.as_secs(),
                "Starting job sweeper"
            );
            let mut ticker = tokio::time::interval(store.config.sweep_interval);
            loop {
                ticker.tick().await;
                let evicted = store.evict_expired();
                if evicted > 0 {
                    metrics::counter!("extraction_jobs_evicted_total").increment(evicted as u64);
                    tracing::info!(evicted, remaining = store.len(), "Evicted expired jobs");
                }
            }
        })
    }

    fn update<T>(&self, id: Uuid, f: impl FnOnce(&mut ExtractionJob) -> T) -> Option<T> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id)?;
        let out = f(job);
        job.updated_at = Utc::now();
        Some(out)
    }
}

fn evict_oldest_finished(jobs: &mut HashMap<Uuid, ExtractionJob>, count: usize) -> usize {
    let mut finished: Vec<_> = jobs
        .values()
        .filter(|job| job.status.is_terminal())
        .map(|job| (job.updated_at, job.id))
        .collect();
    finished.sort();

    let victims: Vec<Uuid> = finished.into_iter().take(count).map(|(_, id)| id).collect();
    for id in &victims {
        jobs.remove(id);
    }
    victims.len()
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Job is {0}, not ready")]
    NotReady(JobStatus),

    #[error("{0}")]
    ProcessingFailed(String),
}
