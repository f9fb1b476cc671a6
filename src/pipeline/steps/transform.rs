//! Window transform: recompute the fact rows of a date window from the raw table.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::constants::{FACT_TABLE, PLACE_MARKER, RAW_TABLE};
use crate::error::{PipelineError, Result, StoreError};
use crate::metrics::TransformMetrics;
use crate::pipeline::storage::warehouse::{DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::pipeline::storage::Warehouse;
use crate::types::{DateWindow, FactRow, RawRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReplaceOutcome {
    deleted: usize,
    inserted: usize,
    passthrough: usize,
}

pub struct WindowTransformer<'w> {
    warehouse: &'w mut Warehouse,
}

impl<'w> WindowTransformer<'w> {
    pub fn new(warehouse: &'w mut Warehouse) -> Self {
        Self { warehouse }
    }

    /// Atomically replace the fact rows dated within `window` with rows derived from
    /// every raw row whose event date falls in the same window.
    #[instrument(skip_all, fields(window = %window))]
    pub fn transform(&mut self, window: &DateWindow) -> Result<usize> {
        let started = Instant::now();
        match replace_window(self.warehouse.connection_mut(), window) {
            Ok(outcome) => {
                TransformMetrics::record_place_passthrough(outcome.passthrough);
                TransformMetrics::record_success(outcome.inserted, started.elapsed().as_secs_f64());
                info!(
                    deleted = outcome.deleted,
                    inserted = outcome.inserted,
                    passthrough = outcome.passthrough,
                    "Window transformed"
                );
                Ok(outcome.inserted)
            }
            Err(source) => {
                TransformMetrics::record_error();
                error!("Window transform rolled back: {}", source);
                Err(PipelineError::Transform {
                    window: *window,
                    source,
                })
            }
        }
    }
}

fn replace_window(
    conn: &mut Connection,
    window: &DateWindow,
) -> std::result::Result<ReplaceOutcome, StoreError> {
    let start = window.start().format(DATE_FORMAT).to_string();
    let end = window.end().format(DATE_FORMAT).to_string();

    let tx = conn.transaction()?;
    let deleted = tx.execute(
        &format!("DELETE FROM {} WHERE event_dt BETWEEN ?1 AND ?2", FACT_TABLE),
        params![start, end],
    )?;

    // integer division drops the milliseconds, as event_timestamp() does
    let raw_rows = {
        let mut select = tx.prepare(&format!(
            "SELECT time, place, magnitude, longitude, latitude, depth, filename FROM {}
             WHERE date(time / 1000, 'unixepoch') BETWEEN ?1 AND ?2
             ORDER BY time",
            RAW_TABLE
        ))?;
        let rows = select.query_map(params![start, end], |row| {
            Ok(RawRow {
                occurred_at_epoch_millis: row.get(0)?,
                place: row.get(1)?,
                magnitude: row.get(2)?,
                longitude: row.get(3)?,
                latitude: row.get(4)?,
                depth: row.get(5)?,
                batch_key: row.get(6)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    };
    debug!(selected = raw_rows.len(), "Selected raw rows");

    let mut passthrough = 0;
    {
        let mut insert = tx.prepare(&format!(
            "INSERT INTO {} (event_ts, event_dt, place, magnitude, longitude, latitude, depth)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            FACT_TABLE
        ))?;
        for raw in &raw_rows {
            if extract_location(&raw.place).is_none() {
                passthrough += 1;
            }
            let fact = derive_fact_row(raw)?;
            insert.execute(params![
                fact.event_timestamp.format(TIMESTAMP_FORMAT).to_string(),
                fact.event_date.format(DATE_FORMAT).to_string(),
                fact.place,
                fact.magnitude,
                fact.longitude,
                fact.latitude,
                fact.depth,
            ])?;
        }
    }

    tx.execute(
        "INSERT INTO transform_log (window_start, window_end, row_count, ran_at) VALUES (?1, ?2, ?3, ?4)",
        params![start, end, raw_rows.len() as i64, Utc::now().to_rfc3339()],
    )?;
    tx.commit()?;

    Ok(ReplaceOutcome {
        deleted,
        inserted: raw_rows.len(),
        passthrough,
    })
}

/// Derive the cleaned fact row for one raw row.
pub fn derive_fact_row(raw: &RawRow) -> std::result::Result<FactRow, StoreError> {
    let event_timestamp = event_timestamp(raw.occurred_at_epoch_millis)?;
    Ok(FactRow {
        event_timestamp,
        event_date: event_timestamp.date(),
        place: clean_place(&raw.place).to_string(),
        magnitude: raw.magnitude,
        longitude: raw.longitude,
        latitude: raw.latitude,
        depth: raw.depth,
    })
}

/// UTC timestamp of whole seconds since the epoch; milliseconds are truncated.
pub fn event_timestamp(epoch_millis: i64) -> std::result::Result<NaiveDateTime, StoreError> {
    DateTime::<Utc>::from_timestamp(epoch_millis / 1000, 0)
        .map(|ts| ts.naive_utc())
        .ok_or_else(|| StoreError::Decode(format!("timestamp out of range: {}", epoch_millis)))
}

/// The location name following the first `"of "` in a feed place, trimmed.
///
/// `None` when the marker is absent.
pub fn extract_location(place: &str) -> Option<&str> {
    place
        .find(PLACE_MARKER)
        .map(|pos| place[pos + PLACE_MARKER.len()..].trim())
}

/// Cleaned place for the fact table. Places without the marker pass through unmodified.
pub fn clean_place(place: &str) -> &str {
    extract_location(place).unwrap_or(place)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn raw(time: i64, place: &str) -> RawRow {
        RawRow {
            occurred_at_epoch_millis: time,
            place: place.to_string(),
            magnitude: 4.2,
            longitude: 142.1,
            latitude: 38.3,
            depth: 35.0,
            batch_key: "2026_01_16".to_string(),
        }
    }

    #[test]
    fn test_clean_place_keeps_location_name() {
        assert_eq!(clean_place("10km ENE of Example Town"), "Example Town");
        assert_eq!(clean_place("3 km N of  Somewhere, CA  "), "Somewhere, CA");
    }

    #[test]
    fn test_clean_place_uses_first_marker() {
        assert_eq!(clean_place("120 km S of Gulf of Alaska"), "Gulf of Alaska");
    }

    #[test]
    fn test_clean_place_passes_through_without_marker() {
        assert_eq!(clean_place("Southern Mid-Atlantic Ridge"), "Southern Mid-Atlantic Ridge");
        assert_eq!(clean_place("  Fiji region "), "  Fiji region ");
        assert_eq!(extract_location("Fiji region"), None);
    }

    #[test]
    fn test_marker_at_end_yields_empty_location() {
        assert_eq!(extract_location("5 km W of "), Some(""));
    }

    #[test]
    fn test_event_timestamp_truncates_millis() {
        let ts = event_timestamp(1_700_000_000_999).unwrap();
        assert_eq!(ts.to_string(), "2023-11-14 22:13:20");
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2023, 11, 14).unwrap());
    }

    #[test]
    fn test_derive_fact_row() {
        let fact = derive_fact_row(&raw(1_700_000_000_000, "10km ENE of Example Town")).unwrap();
        assert_eq!(fact.event_date, NaiveDate::from_ymd_opt(2023, 11, 14).unwrap());
        assert_eq!(fact.place, "Example Town");
        assert_eq!(fact.magnitude, 4.2);
        assert_eq!(fact.depth, 35.0);
    }

    #[test]
    fn test_out_of_range_timestamp_is_rejected() {
        assert!(matches!(event_timestamp(i64::MAX), Err(StoreError::Decode(_))));
    }
}
