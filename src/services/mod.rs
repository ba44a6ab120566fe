pub mod engine;
pub mod job_store;
pub mod normalizer;
pub mod pipeline;
pub mod scheduler;
pub mod upload;
pub mod validation;
