//! Runs extract, write, load and transform in sequence for one capture date.
//!
//! No scheduling or retries here: a failed stage aborts the run and its error
//! names the stage. Callers decide whether to re-run.

use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, info_span};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::infra::http_client::ReqwestHttp;
use crate::pipeline::ingestion::{BatchWriter, FeedClient};
use crate::pipeline::steps::{StagingLoader, WindowTransformer};
use crate::pipeline::storage::Warehouse;
use crate::types::{BatchKey, DateWindow};

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub batch_key: BatchKey,
    pub window: DateWindow,
    pub fetched: usize,
    pub batch_file: PathBuf,
    pub loaded: usize,
    pub transformed: usize,
}

pub struct PipelineRunner {
    feed: FeedClient,
    writer: BatchWriter,
    warehouse: Warehouse,
}

impl PipelineRunner {
    pub fn new(feed: FeedClient, writer: BatchWriter, warehouse: Warehouse) -> Self {
        Self {
            feed,
            writer,
            warehouse,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http = ReqwestHttp::new(Duration::from_secs(config.feed.timeout_seconds))?;
        let feed = FeedClient::new(Box::new(http), config.feed.url.clone());
        let writer = BatchWriter::new(&config.batch.output_dir, config.batch.file_prefix.clone());
        let warehouse = Warehouse::open(&config.warehouse.path)?;
        Ok(Self::new(feed, writer, warehouse))
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    /// One full run: fetch `window`, write the batch for `capture_date`, load it, and
    /// recompute the fact rows for the same window.
    pub fn run(&mut self, capture_date: NaiveDate, window: DateWindow) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let batch_key = BatchKey::from_capture_date(capture_date);
        let span = info_span!("pipeline_run", run_id = %run_id, batch_key = %batch_key);
        let _enter = span.enter();

        let report = self.run_stages(run_id, batch_key, window).inspect_err(|e| {
            error!(stage = %e.stage(), "Pipeline run failed: {}", e);
        })?;
        info!(
            fetched = report.fetched,
            loaded = report.loaded,
            transformed = report.transformed,
            "Pipeline run finished"
        );
        Ok(report)
    }

    fn run_stages(
        &mut self,
        run_id: Uuid,
        batch_key: BatchKey,
        window: DateWindow,
    ) -> Result<RunReport> {
        let records = self.feed.fetch(&window, &batch_key)?;
        let batch_file = self.writer.write(&records, &batch_key)?;
        let loaded = StagingLoader::new(&mut self.warehouse).load(&batch_key, &batch_file)?;
        let transformed = WindowTransformer::new(&mut self.warehouse).transform(&window)?;

        Ok(RunReport {
            run_id,
            batch_key,
            window,
            fetched: records.len(),
            batch_file,
            loaded,
            transformed,
        })
    }
}
