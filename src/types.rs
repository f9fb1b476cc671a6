use crate::error::{PipelineError, Result};
use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one capture run's batch, derived from the capture date (`YYYY_MM_DD`).
///
/// Scopes the delete half of a staging reload, so it is written into every
/// row of the batch file and must survive a CSV round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchKey(String);

impl BatchKey {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let valid = !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(value))
        } else {
            Err(PipelineError::InvalidBatchKey(value))
        }
    }

    pub fn from_capture_date(date: NaiveDate) -> Self {
        Self(date.format("%Y_%m_%d").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive date range scoping a fetch or a fact-table replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PipelineError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` days before `end`, through `end` itself.
    pub fn trailing_days(end: NaiveDate, days: u32) -> Result<Self> {
        let start = end
            .checked_sub_days(Days::new(u64::from(days)))
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "look-back of {} days before {} is out of range",
                    days, end
                ))
            })?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// One feed item, as extracted and written to a batch file.
///
/// Field order here is the batch file column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "time")]
    pub occurred_at_epoch_millis: i64,
    pub place: String,
    pub magnitude: f64,
    pub longitude: f64,
    pub latitude: f64,
    pub depth: f64,
    #[serde(rename = "file_name")]
    pub batch_key: String,
}

/// A staging-table row is an event record persisted verbatim.
pub type RawRow = EventRecord;

/// A cleaned row of the fact table, partitioned by `event_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub event_timestamp: NaiveDateTime,
    pub event_date: NaiveDate,
    pub place: String,
    pub magnitude: f64,
    pub longitude: f64,
    pub latitude: f64,
    pub depth: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_batch_key_from_capture_date() {
        let key = BatchKey::from_capture_date(date(2026, 1, 16));
        assert_eq!(key.as_str(), "2026_01_16");
    }

    #[test]
    fn test_batch_key_rejects_delimiters() {
        assert!(BatchKey::new("2026_01_16").is_ok());
        assert!(BatchKey::new("").is_err());
        assert!(BatchKey::new("a,b").is_err());
        assert!(BatchKey::new("a\nb").is_err());
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let window = DateWindow::new(date(2025, 12, 31), date(2026, 1, 15)).unwrap();
        assert!(window.contains(date(2025, 12, 31)));
        assert!(window.contains(date(2026, 1, 15)));
        assert!(!window.contains(date(2026, 1, 16)));
        assert_eq!(window.to_string(), "[2025-12-31, 2026-01-15]");
    }

    #[test]
    fn test_window_rejects_reversed_bounds() {
        let err = DateWindow::new(date(2026, 1, 2), date(2026, 1, 1)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidWindow { .. }));
    }

    #[test]
    fn test_trailing_window() {
        let window = DateWindow::trailing_days(date(2026, 1, 16), 15).unwrap();
        assert_eq!(window.start(), date(2026, 1, 1));
        assert_eq!(window.end(), date(2026, 1, 16));
    }

    #[test]
    fn test_trailing_window_out_of_range_is_config_error() {
        let config = crate::config::Config::from_toml("[feed]\nlookback_days = 4000000000").unwrap();
        let err = DateWindow::trailing_days(date(2026, 1, 16), config.feed.lookback_days).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));

        let zero = DateWindow::trailing_days(date(2026, 1, 16), 0).unwrap();
        assert_eq!(zero.start(), zero.end());
    }
}
