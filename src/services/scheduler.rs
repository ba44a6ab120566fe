use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::job::SubmitOptions;
use crate::services::engine::Extractor;
use crate::services::job_store::JobStore;
use crate::services::pipeline;
use crate::services::upload::VideoHandle;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub worker_count: usize,
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            queue_capacity: 32,
        }
    }
}

/// Work item handed from `submit` to a worker.
struct QueuedExtraction {
    job_id: Uuid,
    video: VideoHandle,
    options: SubmitOptions,
}

/// Bounded worker pool that runs extraction jobs in the background.
pub struct Scheduler {
    store: Arc<JobStore>,
    sender: Mutex<Option<mpsc::Sender<QueuedExtraction>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Spawn the worker pool. Must be called inside a tokio runtime.
    pub fn start(store: Arc<JobStore>, extractor: Arc<dyn Extractor>, config: SchedulerConfig) -> Self {
        let config = SchedulerConfig {
            worker_count: config.worker_count.max(1),
            queue_capacity: config.queue_capacity.max(1),
        };
        let (sender, receiver) = mpsc::channel::<QueuedExtraction>(config.queue_capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..config.worker_count)
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let store = Arc::clone(&store);
                let extractor = Arc::clone(&extractor);
                tokio::spawn(async move {
                    tracing::debug!(worker_id, "Extraction worker started");
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(task) = next else { break };
                        let job_id = task.job_id;
                        supervise(&store, job_id, run_job(&store, extractor.as_ref(), task)).await;
                    }
                    tracing::debug!(worker_id, "Extraction worker stopped");
                })
            })
            .collect();

        tracing::info!(
            workers = config.worker_count,
            queue_capacity = config.queue_capacity,
            "Extraction scheduler started"
        );

        Self {
            store,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    fn sender(&self) -> Option<mpsc::Sender<QueuedExtraction>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// False once shutdown has begun.
    pub fn is_accepting(&self) -> bool {
        self.sender().is_some_and(|tx| !tx.is_closed())
    }

    /// Jobs accepted but not yet picked up by a worker.
    pub fn queue_depth(&self) -> usize {
        self.sender()
            .map(|tx| tx.max_capacity() - tx.capacity())
            .unwrap_or(0)
    }

    /// Queue a video for extraction and return the job id without waiting for it.
    ///
    /// The scheduler owns the video from here on and deletes it once the job
    /// ends, or immediately if the submission is rejected.
    pub async fn submit(&self, video: VideoHandle, options: SubmitOptions) -> Result<Uuid, SubmitError> {
        if !video.is_readable().await {
            return Err(SubmitError::Unreadable(video.path().display().to_string()));
        }
        let sender = self.sender().ok_or(SubmitError::ShuttingDown)?;

        let job_id = self.store.create();
        let task = QueuedExtraction { job_id, video, options };

        match sender.try_send(task) {
            Ok(()) => {
                metrics::counter!("extraction_jobs_submitted_total").increment(1);
                metrics::gauge!("extraction_queue_depth").set(self.queue_depth() as f64);
                tracing::info!(job_id = %job_id, "Extraction job queued");
                Ok(job_id)
            }
            Err(TrySendError::Full(task)) => {
                self.reject(task);
                tracing::warn!(job_id = %job_id, capacity = self.config.queue_capacity, "Extraction queue full");
                Err(SubmitError::QueueFull)
            }
            Err(TrySendError::Closed(task)) => {
                self.reject(task);
                Err(SubmitError::ShuttingDown)
            }
        }
    }

    fn reject(&self, task: QueuedExtraction) {
        metrics::counter!("extraction_jobs_rejected_total").increment(1);
        self.store.delete(task.job_id);
        if let Err(e) = task.video.release() {
            tracing::warn!(job_id = %task.job_id, error = %e, "Failed to remove rejected upload");
        }
    }

    /// Stop accepting work and wait for queued jobs to finish.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().unwrap_or_else(PoisonError::into_inner).take());
        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));

        tracing::info!(workers = workers.len(), "Draining extraction workers");
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Extraction worker ended abnormally");
            }
        }
    }
}

/// Keep the worker alive when a job panics outside the guarded pipeline.
async fn supervise<F: Future<Output = ()>>(store: &JobStore, job_id: Uuid, job: F) {
    if let Err(payload) = AssertUnwindSafe(job).catch_unwind().await {
        let error = pipeline::PipelineError::Panicked(pipeline::panic_message(payload.as_ref()));
        metrics::counter!("extraction_jobs_failed_total").increment(1);
        tracing::error!(job_id = %job_id, error = %error, "Extraction job panicked");
        store.fail(job_id, error.to_string());
    }
}

/// Execute one job end to end. The video is released on every path.
async fn run_job(store: &JobStore, extractor: &dyn Extractor, task: QueuedExtraction) {
    let QueuedExtraction { job_id, video, options } = task;

    if !store.mark_processing(job_id) {
        tracing::info!(job_id = %job_id, "Job removed before processing started");
        release(job_id, video);
        return;
    }

    tracing::info!(
        job_id = %job_id,
        video = %video.filename(),
        vehicle_type = options.vehicle_type.as_deref().unwrap_or("car"),
        range = options.range.as_deref().unwrap_or(""),
        "Processing extraction job"
    );
    let start = Instant::now();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (outcome, ()) = tokio::join!(
        async {
            let outcome = pipeline::process_video_guarded(extractor, &video, &options, Some(&tx)).await;
            drop(tx);
            outcome
        },
        async {
            while let Some(event) = rx.recv().await {
                store.record_progress(job_id, &event);
            }
        }
    );

    metrics::histogram!("extraction_processing_seconds").record(start.elapsed().as_secs_f64());

    match outcome {
        Ok(result) => {
            let summary_error = result.summary.error.clone();
            if store.complete(job_id, result) {
                metrics::counter!("extraction_jobs_completed_total").increment(1);
                tracing::info!(
                    job_id = %job_id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    summary_error = summary_error.as_deref().unwrap_or(""),
                    "Extraction job done"
                );
            } else {
                tracing::info!(job_id = %job_id, "Job removed while processing; result discarded");
            }
        }
        Err(e) => {
            metrics::counter!("extraction_jobs_failed_total").increment(1);
            tracing::error!(job_id = %job_id, error = %e, "Extraction job failed");
            store.fail(job_id, e.to_string());
        }
    }

    release(job_id, video);
}

fn release(job_id: Uuid, video: VideoHandle) {
    let path = video.path().display().to_string();
    match video.release() {
        Ok(()) => tracing::debug!(job_id = %job_id, path = %path, "Released uploaded video"),
        Err(e) => tracing::warn!(job_id = %job_id, path = %path, error = %e, "Failed to remove uploaded video"),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Uploaded video is not readable: {0}")]
    Unreadable(String),

    #[error("Extraction queue is full, try again later")]
    QueueFull,

    #[error("Scheduler is shutting down")]
    ShuttingDown,
}
