use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::debug;

use crate::constants::{FACT_TABLE, RAW_TABLE};
use crate::error::{Result, StoreError};
use crate::types::{BatchKey, DateWindow, FactRow};

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ledger entry written by each successful staging load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadLogEntry {
    pub batch_key: String,
    pub file_sha256: String,
    pub row_count: usize,
    pub loaded_at: String,
}

/// Ledger entry written by each successful window transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformLogEntry {
    pub window_start: String,
    pub window_end: String,
    pub row_count: usize,
    pub ran_at: String,
}

/// Handle on the relational store holding the raw and fact tables.
///
/// Owns the connection; it is closed when the warehouse is dropped.
pub struct Warehouse {
    conn: Connection,
}

impl Warehouse {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StoreError::from)?;
            }
        }
        let conn = Connection::open(path).map_err(StoreError::from)?;
        debug!(path = %path.display(), "Opened warehouse");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {raw} (
                time      INTEGER NOT NULL,
                place     TEXT    NOT NULL,
                magnitude REAL    NOT NULL,
                longitude REAL    NOT NULL,
                latitude  REAL    NOT NULL,
                depth     REAL    NOT NULL,
                filename  TEXT    NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{raw}_filename ON {raw} (filename);
            CREATE TABLE IF NOT EXISTS {fact} (
                event_ts  TEXT NOT NULL,
                event_dt  TEXT NOT NULL,
                place     TEXT NOT NULL,
                magnitude REAL NOT NULL,
                longitude REAL NOT NULL,
                latitude  REAL NOT NULL,
                depth     REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{fact}_event_dt ON {fact} (event_dt);
            CREATE TABLE IF NOT EXISTS load_log (
                batch_key   TEXT PRIMARY KEY,
                file_sha256 TEXT NOT NULL,
                row_count   INTEGER NOT NULL,
                loaded_at   TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS transform_log (
                window_start TEXT NOT NULL,
                window_end   TEXT NOT NULL,
                row_count    INTEGER NOT NULL,
                ran_at       TEXT NOT NULL
            );
            "#,
            raw = RAW_TABLE,
            fact = FACT_TABLE,
        ))
        .map_err(StoreError::from)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn raw_row_count(&self, batch_key: &BatchKey) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE filename = ?1", RAW_TABLE),
                params![batch_key.as_str()],
                |row| row.get(0),
            )
            .map_err(StoreError::from)?;
        Ok(count as usize)
    }

    pub fn fact_row_count(&self, window: &DateWindow) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE event_dt BETWEEN ?1 AND ?2",
                    FACT_TABLE
                ),
                params![
                    window.start().format(DATE_FORMAT).to_string(),
                    window.end().format(DATE_FORMAT).to_string()
                ],
                |row| row.get(0),
            )
            .map_err(StoreError::from)?;
        Ok(count as usize)
    }

    /// Fact rows in `window`, ordered by event timestamp.
    pub fn fact_rows(&self, window: &DateWindow) -> Result<Vec<FactRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT event_ts, event_dt, place, magnitude, longitude, latitude, depth
                 FROM {} WHERE event_dt BETWEEN ?1 AND ?2 ORDER BY event_ts, place",
                FACT_TABLE
            ))
            .map_err(StoreError::from)?;
        let rows = stmt
            .query_map(
                params![
                    window.start().format(DATE_FORMAT).to_string(),
                    window.end().format(DATE_FORMAT).to_string()
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, f64>(6)?,
                    ))
                },
            )
            .map_err(StoreError::from)?;

        let mut out = Vec::new();
        for row in rows {
            let (ts, dt, place, magnitude, longitude, latitude, depth) =
                row.map_err(StoreError::from)?;
            let event_timestamp = NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT)
                .map_err(|e| StoreError::Decode(format!("event_ts '{}': {}", ts, e)))?;
            let event_date = NaiveDate::parse_from_str(&dt, DATE_FORMAT)
                .map_err(|e| StoreError::Decode(format!("event_dt '{}': {}", dt, e)))?;
            out.push(FactRow {
                event_timestamp,
                event_date,
                place,
                magnitude,
                longitude,
                latitude,
                depth,
            });
        }
        Ok(out)
    }

    pub fn load_log(&self) -> Result<Vec<LoadLogEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT batch_key, file_sha256, row_count, loaded_at FROM load_log ORDER BY batch_key",
            )
            .map_err(StoreError::from)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LoadLogEntry {
                    batch_key: row.get(0)?,
                    file_sha256: row.get(1)?,
                    row_count: row.get::<_, i64>(2)? as usize,
                    loaded_at: row.get(3)?,
                })
            })
            .map_err(StoreError::from)?;
        let entries = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        Ok(entries)
    }

    /// Most recent transform runs first.
    pub fn transform_log(&self, limit: usize) -> Result<Vec<TransformLogEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT window_start, window_end, row_count, ran_at FROM transform_log
                 ORDER BY rowid DESC LIMIT ?1",
            )
            .map_err(StoreError::from)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(TransformLogEntry {
                    window_start: row.get(0)?,
                    window_end: row.get(1)?,
                    row_count: row.get::<_, i64>(2)? as usize,
                    ran_at: row.get(3)?,
                })
            })
            .map_err(StoreError::from)?;
        let entries = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        Ok(entries)
    }
}
