//! Feed client: one GeoJSON query per call, mapped into batch-stamped event records.

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::app::ports::HttpClientPort;
use crate::constants::FEED_FORMAT;
use crate::error::{PipelineError, Result};
use crate::metrics::ExtractMetrics;
use crate::types::{BatchKey, DateWindow, EventRecord};

#[derive(Debug, Deserialize)]
struct FeedDocument {
    features: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct FeedFeature {
    properties: Option<FeedProperties>,
    geometry: Option<FeedGeometry>,
}

#[derive(Debug, Deserialize)]
struct FeedProperties {
    time: Option<i64>,
    place: Option<String>,
    mag: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FeedGeometry {
    #[serde(default)]
    coordinates: Vec<f64>,
}

pub struct FeedClient {
    http: Box<dyn HttpClientPort>,
    base_url: String,
}

impl FeedClient {
    pub fn new(http: Box<dyn HttpClientPort>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Query URL for `window`. The end bound is sent as the last millisecond of its
    /// day so every event on the end date is included.
    pub fn query_url(&self, window: &DateWindow) -> Result<Url> {
        let start = window.start().format("%Y-%m-%d").to_string();
        let end = format!("{}T23:59:59.999", window.end().format("%Y-%m-%d"));
        Url::parse_with_params(
            &self.base_url,
            &[
                ("format", FEED_FORMAT),
                ("starttime", start.as_str()),
                ("endtime", end.as_str()),
            ],
        )
        .map_err(|e| PipelineError::Config(format!("invalid feed url '{}': {}", self.base_url, e)))
    }

    /// Fetch every event in `window`, stamping each record with `batch_key`.
    #[instrument(skip_all, fields(window = %window, batch_key = %batch_key))]
    pub fn fetch(&self, window: &DateWindow, batch_key: &BatchKey) -> Result<Vec<EventRecord>> {
        let url = self.query_url(window)?;
        let started = Instant::now();
        info!("Fetching feed");

        let response = self.http.get(url.as_str()).map_err(|reason| {
            ExtractMetrics::record_request_error();
            PipelineError::FeedUnavailable {
                url: url.to_string(),
                reason,
            }
        })?;
        if !response.is_success() {
            ExtractMetrics::record_request_error();
            warn!(status = response.status, "Feed returned non-success status");
            return Err(PipelineError::FeedUnavailable {
                url: url.to_string(),
                reason: format!("HTTP status {}", response.status),
            });
        }
        debug!(
            bytes = response.bytes.len(),
            content_type = %response.content_type,
            "Feed response received"
        );

        let records = parse_feed(&response.bytes, batch_key).inspect_err(|_| {
            ExtractMetrics::record_request_error();
        })?;
        ExtractMetrics::record_request_success(records.len(), started.elapsed().as_secs_f64());
        info!(records = records.len(), "Feed fetched");
        Ok(records)
    }
}

/// Map a feed document into event records. An empty `features` array is valid.
pub fn parse_feed(body: &[u8], batch_key: &BatchKey) -> Result<Vec<EventRecord>> {
    let document: FeedDocument =
        serde_json::from_slice(body).map_err(|e| PipelineError::FeedParse {
            index: 0,
            reason: format!("invalid feed document: {}", e),
        })?;

    document
        .features
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_feature(index, item, batch_key))
        .collect()
}

fn parse_feature(index: usize, item: Value, batch_key: &BatchKey) -> Result<EventRecord> {
    let malformed = |reason: &str| PipelineError::FeedParse {
        index,
        reason: reason.to_string(),
    };

    let feature: FeedFeature =
        serde_json::from_value(item).map_err(|e| malformed(&e.to_string()))?;
    let properties = feature
        .properties
        .ok_or_else(|| malformed("missing properties"))?;
    let coordinates = feature
        .geometry
        .map(|g| g.coordinates)
        .unwrap_or_default();
    if coordinates.len() < 3 {
        return Err(malformed(&format!(
            "expected 3 coordinates, found {}",
            coordinates.len()
        )));
    }

    Ok(EventRecord {
        occurred_at_epoch_millis: properties.time.ok_or_else(|| malformed("missing time"))?,
        place: properties.place.ok_or_else(|| malformed("missing place"))?,
        magnitude: properties.mag.ok_or_else(|| malformed("missing mag"))?,
        longitude: coordinates[0],
        latitude: coordinates[1],
        depth: coordinates[2],
        batch_key: batch_key.to_string(),
    })
}
