use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::engine::EngineConfig;
use crate::services::job_store::StoreConfig;
use crate::services::scheduler::SchedulerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Explicit engine executable, tried before the fallbacks.
    #[serde(default)]
    pub engine_executable: Option<String>,

    /// Generic engine executables tried in order after the explicit one.
    #[serde(default = "default_engine_fallbacks")]
    pub engine_fallbacks: Vec<String>,

    /// Script handed to interpreter-style engines ahead of the video path.
    #[serde(default)]
    pub engine_script: Option<PathBuf>,

    /// Name used when reporting that no engine could be launched.
    #[serde(default = "default_engine_name")]
    pub engine_name: String,

    /// Per-attempt limit for a single engine run.
    #[serde(default = "default_engine_timeout_secs")]
    pub engine_timeout_secs: u64,

    /// Number of concurrent extraction workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Pending submissions allowed before new ones are rejected
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Age after which finished jobs are dropped from the store
    #[serde(default = "default_job_ttl_secs")]
    pub job_ttl_secs: u64,

    #[serde(default = "default_max_jobs")]
    pub max_jobs: usize,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Directory for uploaded videos awaiting extraction
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Request body limit for uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_engine_fallbacks() -> Vec<String> {
    vec!["python".to_string(), "py".to_string(), "python3".to_string()]
}

fn default_engine_name() -> String {
    "python".to_string()
}

fn default_engine_timeout_secs() -> u64 {
    120
}

fn default_worker_count() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    32
}

fn default_job_ttl_secs() -> u64 {
    3600
}

fn default_max_jobs() -> usize {
    1000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_upload_dir() -> PathBuf {
    std::env::temp_dir().join("dragy-uploads")
}

fn default_max_upload_bytes() -> usize {
    200 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            engine_executable: None,
            engine_fallbacks: default_engine_fallbacks(),
            engine_script: None,
            engine_name: default_engine_name(),
            engine_timeout_secs: default_engine_timeout_secs(),
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            job_ttl_secs: default_job_ttl_secs(),
            max_jobs: default_max_jobs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn engine(&self) -> EngineConfig {
        let mut candidates = Vec::with_capacity(self.engine_fallbacks.len() + 1);
        if let Some(explicit) = self.engine_executable.as_deref().filter(|s| !s.trim().is_empty()) {
            candidates.push(explicit.trim().to_string());
        }
        candidates.extend(
            self.engine_fallbacks
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        );

        EngineConfig {
            name: self.engine_name.clone(),
            candidates,
            script: self.engine_script.clone(),
            timeout: Duration::from_secs(self.engine_timeout_secs),
        }
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            worker_count: self.worker_count.max(1),
            queue_capacity: self.queue_capacity.max(1),
        }
    }

    pub fn store(&self) -> StoreConfig {
        StoreConfig {
            ttl: Duration::from_secs(self.job_ttl_secs),
            max_jobs: self.max_jobs,
            sweep_interval: Duration::from_secs(self.sweep_interval_secs.max(1)),
        }
    }
}
