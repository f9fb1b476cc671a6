//! Defaults and fixed names shared across the pipeline stages.

// Feed
pub const DEFAULT_FEED_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";
pub const FEED_FORMAT: &str = "geojson";
pub const DEFAULT_LOOKBACK_DAYS: u32 = 15;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

// Batch files
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_FILE_PREFIX: &str = "earthquake";
pub const BATCH_FILE_HEADER: [&str; 7] = [
    "time",
    "place",
    "magnitude",
    "longitude",
    "latitude",
    "depth",
    "file_name",
];

// Store
pub const DEFAULT_WAREHOUSE_PATH: &str = "data/warehouse.db";
pub const RAW_TABLE: &str = "earthquake";
pub const FACT_TABLE: &str = "stage_earthquake";

// Logging
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Marker preceding the location name in feed `place` values ("12km NE of Somewhere").
pub const PLACE_MARKER: &str = "of ";
