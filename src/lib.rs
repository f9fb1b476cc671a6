pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod infra;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod types;

pub use error::{PipelineError, Result, Stage, StoreError};
pub use pipeline::ingestion::{BatchWriter, FeedClient};
pub use pipeline::steps::{StagingLoader, WindowTransformer};
pub use pipeline::storage::Warehouse;
pub use types::{BatchKey, DateWindow, EventRecord, FactRow, RawRow};
