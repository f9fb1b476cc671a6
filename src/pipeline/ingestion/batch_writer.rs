//! Writes a batch of event records as a header-first CSV file named after its batch key.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::constants::BATCH_FILE_HEADER;
use crate::error::{PipelineError, Result, StoreError};
use crate::metrics::ExtractMetrics;
use crate::types::{BatchKey, EventRecord};

/// Column order matches `BATCH_FILE_HEADER`.
#[derive(Serialize)]
struct BatchFileRow<'a> {
    time: i64,
    place: &'a str,
    magnitude: f64,
    longitude: f64,
    latitude: f64,
    depth: f64,
    file_name: &'a str,
}

pub struct BatchWriter {
    output_dir: PathBuf,
    file_prefix: String,
}

impl BatchWriter {
    pub fn new(output_dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            file_prefix: file_prefix.into(),
        }
    }

    pub fn path_for(&self, batch_key: &BatchKey) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.csv", self.file_prefix, batch_key))
    }

    /// Replace the batch file for `batch_key` with `records`.
    ///
    /// Every row's `file_name` column carries `batch_key`. An empty batch yields a header-only file.
    #[instrument(skip_all, fields(batch_key = %batch_key, records = records.len()))]
    pub fn write(&self, records: &[EventRecord], batch_key: &BatchKey) -> Result<PathBuf> {
        let path = self.path_for(batch_key);
        write_batch_file(&path, records, batch_key).map_err(|source| PipelineError::BatchWrite {
            path: path.clone(),
            source,
        })?;
        ExtractMetrics::record_batch_written(records.len());
        info!(path = %path.display(), "Batch file written");
        Ok(path)
    }
}

fn write_batch_file(
    path: &Path,
    records: &[EventRecord],
    batch_key: &BatchKey,
) -> std::result::Result<(), StoreError> {
    if path.exists() {
        fs::remove_file(path)?;
        info!(path = %path.display(), "Removed previous batch file");
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // Header is written by hand so an empty batch still gets one
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    wtr.write_record(BATCH_FILE_HEADER)?;
    for record in records {
        wtr.serialize(BatchFileRow {
            time: record.occurred_at_epoch_millis,
            place: &record.place,
            magnitude: record.magnitude,
            longitude: record.longitude,
            latitude: record.latitude,
            depth: record.depth,
            file_name: batch_key.as_str(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(time: i64, place: &str) -> EventRecord {
        EventRecord {
            occurred_at_epoch_millis: time,
            place: place.to_string(),
            magnitude: 1.5,
            longitude: -122.3,
            latitude: 47.6,
            depth: 10.0,
            batch_key: "2026_01_16".to_string(),
        }
    }

    #[test]
    fn test_write_emits_header_and_rows() {
        let dir = tempdir().unwrap();
        let writer = BatchWriter::new(dir.path(), "earthquake");
        let key = BatchKey::new("2026_01_16").unwrap();

        let path = writer
            .write(&[record(1700000000000, "3km N of Somewhere, WA")], &key)
            .unwrap();

        assert_eq!(path, dir.path().join("earthquake_2026_01_16.csv"));
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("time,place,magnitude,longitude,latitude,depth,file_name")
        );
        assert_eq!(
            lines.next(),
            Some("1700000000000,\"3km N of Somewhere, WA\",1.5,-122.3,47.6,10.0,2026_01_16")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_empty_batch_is_header_only() {
        let dir = tempdir().unwrap();
        let writer = BatchWriter::new(dir.path(), "earthquake");
        let key = BatchKey::new("2026_01_16").unwrap();

        let path = writer.write(&[], &key).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_rewrite_replaces_previous_file() {
        let dir = tempdir().unwrap();
        let writer = BatchWriter::new(dir.path().join("nested"), "earthquake");
        let key = BatchKey::new("2026_01_16").unwrap();

        writer
            .write(&[record(1, "a"), record(2, "b"), record(3, "c")], &key)
            .unwrap();
        let path = writer.write(&[record(4, "d")], &key).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\n4,d,"));
    }
}
