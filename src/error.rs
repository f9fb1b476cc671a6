use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::DateWindow;

/// The pipeline stage an error originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Extract,
    Write,
    Load,
    Transform,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::Extract => "extract",
            Stage::Write => "write",
            Stage::Load => "load",
            Stage::Transform => "transform",
        };
        f.write_str(name)
    }
}

/// Failures raised by the relational store while a replace is in flight.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("row {row} belongs to batch '{found}', expected '{expected}'")]
    BatchMismatch {
        expected: String,
        found: String,
        row: usize,
    },

    #[error("unexpected batch file header: {found}")]
    UnexpectedHeader { found: String },

    #[error("stored value could not be decoded: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("feed unavailable at {url}: {reason}")]
    FeedUnavailable { url: String, reason: String },

    #[error("feed item {index} is malformed: {reason}")]
    FeedParse { index: usize, reason: String },

    #[error("failed to write batch file {}: {source}", .path.display())]
    BatchWrite {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("staging load failed for batch '{batch_key}': {source}")]
    Load {
        batch_key: String,
        #[source]
        source: StoreError,
    },

    #[error("transform failed for window {window}: {source}")]
    Transform {
        window: DateWindow,
        #[source]
        source: StoreError,
    },

    #[error("invalid date window: start {start} is after end {end}")]
    InvalidWindow {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("invalid batch key '{0}'")]
    InvalidBatchKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Which stage the failure should be reported against.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::FeedUnavailable { .. } | PipelineError::FeedParse { .. } => {
                Stage::Extract
            }
            PipelineError::BatchWrite { .. } => Stage::Write,
            PipelineError::Load { .. } => Stage::Load,
            PipelineError::Transform { .. } => Stage::Transform,
            PipelineError::InvalidWindow { .. }
            | PipelineError::InvalidBatchKey(_)
            | PipelineError::Config(_)
            | PipelineError::Store(_) => Stage::Setup,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
