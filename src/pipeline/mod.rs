// Extract -> stage -> transform pipeline

pub mod ingestion;
pub mod orchestrator;
pub mod steps;
pub mod storage;

pub use orchestrator::{PipelineRunner, RunReport};
