use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{
    engine::{Extractor, ProcessEngine},
    job_store::JobStore,
    scheduler::Scheduler,
    upload::{UploadError, UploadStore},
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub scheduler: Arc<Scheduler>,
    pub extractor: Arc<dyn Extractor>,
    pub uploads: Arc<UploadStore>,
}

impl AppState {
    /// Build the job pipeline around the configured process engine.
    pub fn from_config(config: &AppConfig) -> Result<Self, UploadError> {
        let engine = ProcessEngine::new(config.engine());
        Self::with_extractor(config, Arc::new(engine))
    }

    /// Build the job pipeline around any extractor. Spawns the worker pool.
    pub fn with_extractor(config: &AppConfig, extractor: Arc<dyn Extractor>) -> Result<Self, UploadError> {
        let uploads = UploadStore::new(&config.upload_dir)?;
        let store = Arc::new(JobStore::new(config.store()));
        let scheduler = Scheduler::start(Arc::clone(&store), Arc::clone(&extractor), config.scheduler());

        Ok(Self {
            store,
            scheduler: Arc::new(scheduler),
            extractor,
            uploads: Arc::new(uploads),
        })
    }
}
