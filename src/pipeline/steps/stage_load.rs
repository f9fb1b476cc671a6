//! Staging load: replace every raw row of one batch with the contents of its batch file.

use chrono::Utc;
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, instrument};

use crate::constants::{BATCH_FILE_HEADER, RAW_TABLE};
use crate::error::{PipelineError, Result, StoreError};
use crate::metrics::LoadMetrics;
use crate::pipeline::storage::Warehouse;
use crate::types::{BatchKey, RawRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReplaceOutcome {
    deleted: usize,
    inserted: usize,
}

pub struct StagingLoader<'w> {
    warehouse: &'w mut Warehouse,
}

impl<'w> StagingLoader<'w> {
    pub fn new(warehouse: &'w mut Warehouse) -> Self {
        Self { warehouse }
    }

    /// Atomically replace the raw rows of `batch_key` with the rows of `file_path`.
    ///
    /// The delete, the bulk insert and the ledger update share one transaction; on
    /// any failure the previous rows for the key are left untouched.
    #[instrument(skip_all, fields(batch_key = %batch_key, file = %file_path.display()))]
    pub fn load(&mut self, batch_key: &BatchKey, file_path: &Path) -> Result<usize> {
        let started = Instant::now();
        match replace_batch(self.warehouse.connection_mut(), batch_key, file_path) {
            Ok(outcome) => {
                LoadMetrics::record_replaced(outcome.deleted);
                LoadMetrics::record_success(outcome.inserted, started.elapsed().as_secs_f64());
                info!(
                    deleted = outcome.deleted,
                    inserted = outcome.inserted,
                    "Batch loaded"
                );
                Ok(outcome.inserted)
            }
            Err(source) => {
                LoadMetrics::record_error();
                error!("Batch load rolled back: {}", source);
                Err(PipelineError::Load {
                    batch_key: batch_key.to_string(),
                    source,
                })
            }
        }
    }
}

fn replace_batch(
    conn: &mut Connection,
    batch_key: &BatchKey,
    file_path: &Path,
) -> std::result::Result<ReplaceOutcome, StoreError> {
    let bytes = fs::read(file_path)?;
    let file_sha256 = hex::encode(Sha256::digest(&bytes));

    let tx = conn.transaction()?;
    let deleted = tx.execute(
        &format!("DELETE FROM {} WHERE filename = ?1", RAW_TABLE),
        params![batch_key.as_str()],
    )?;

    let mut inserted = 0;
    {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b',')
            .from_reader(bytes.as_slice());
        let headers = rdr.headers()?.clone();
        if !headers.iter().eq(BATCH_FILE_HEADER.iter().copied()) {
            return Err(StoreError::UnexpectedHeader {
                found: headers.iter().collect::<Vec<_>>().join(","),
            });
        }

        let mut insert = tx.prepare(&format!(
            "INSERT INTO {} (time, place, magnitude, longitude, latitude, depth, filename)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            RAW_TABLE
        ))?;
        for (i, record) in rdr.deserialize::<RawRow>().enumerate() {
            let row = record?;
            // A row under another key would survive every later reload of this one
            if row.batch_key != batch_key.as_str() {
                return Err(StoreError::BatchMismatch {
                    expected: batch_key.to_string(),
                    found: row.batch_key,
                    row: i + 1,
                });
            }
            insert.execute(params![
                row.occurred_at_epoch_millis,
                row.place,
                row.magnitude,
                row.longitude,
                row.latitude,
                row.depth,
                row.batch_key,
            ])?;
            inserted += 1;
        }
    }

    tx.execute(
        "INSERT INTO load_log (batch_key, file_sha256, row_count, loaded_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(batch_key) DO UPDATE SET file_sha256=excluded.file_sha256,
             row_count=excluded.row_count, loaded_at=excluded.loaded_at",
        params![
            batch_key.as_str(),
            file_sha256,
            inserted as i64,
            Utc::now().to_rfc3339()
        ],
    )?;
    tx.commit()?;

    Ok(ReplaceOutcome { deleted, inserted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HEADER: &str = "time,place,magnitude,longitude,latitude,depth,file_name\n";

    #[test]
    fn test_reload_replaces_rows_for_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.csv");
        let key = BatchKey::new("2026_01_16").unwrap();
        let mut warehouse = Warehouse::open_in_memory().unwrap();

        fs::write(
            &path,
            format!(
                "{HEADER}1,a,1.0,1.0,1.0,1.0,2026_01_16\n2,b,1.0,1.0,1.0,1.0,2026_01_16\n"
            ),
        )
        .unwrap();
        assert_eq!(StagingLoader::new(&mut warehouse).load(&key, &path).unwrap(), 2);

        fs::write(&path, format!("{HEADER}3,c,1.0,1.0,1.0,1.0,2026_01_16\n")).unwrap();
        assert_eq!(StagingLoader::new(&mut warehouse).load(&key, &path).unwrap(), 1);

        assert_eq!(warehouse.raw_row_count(&key).unwrap(), 1);
        let log = warehouse.load_log().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].row_count, 1);
        assert_eq!(log[0].file_sha256.len(), 64);
    }

    #[test]
    fn test_rows_for_other_key_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.csv");
        let key = BatchKey::new("2026_01_16").unwrap();
        let mut warehouse = Warehouse::open_in_memory().unwrap();
        fs::write(
            &path,
            format!("{HEADER}1,a,1.0,1.0,1.0,1.0,2026_01_16\n2,b,1.0,1.0,1.0,1.0,2026_01_15\n"),
        )
        .unwrap();

        let err = StagingLoader::new(&mut warehouse)
            .load(&key, &path)
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Load {
                source: StoreError::BatchMismatch { row: 2, .. },
                ..
            }
        ));
        assert_eq!(warehouse.raw_row_count(&key).unwrap(), 0);
    }

    #[test]
    fn test_unexpected_header_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.csv");
        let key = BatchKey::new("2026_01_16").unwrap();
        let mut warehouse = Warehouse::open_in_memory().unwrap();
        fs::write(&path, "time,place,mag\n1,a,1.0\n").unwrap();

        let err = StagingLoader::new(&mut warehouse)
            .load(&key, &path)
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Load {
                source: StoreError::UnexpectedHeader { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = tempdir().unwrap();
        let key = BatchKey::new("2026_01_16").unwrap();
        let mut warehouse = Warehouse::open_in_memory().unwrap();

        let err = StagingLoader::new(&mut warehouse)
            .load(&key, &dir.path().join("absent.csv"))
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Load {
                source: StoreError::Io(_),
                ..
            }
        ));
    }
}
