#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use quake_pipeline::app::ports::{HttpClientPort, HttpGetResult};
use quake_pipeline::{BatchKey, DateWindow, EventRecord};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Serves one canned response and records every requested URL.
#[derive(Clone)]
pub struct CannedFeed {
    status: u16,
    body: Vec<u8>,
    pub requested: Arc<Mutex<Vec<String>>>,
}

impl CannedFeed {
    pub fn ok(features: Vec<Value>) -> Self {
        Self::with_status(200, json!({ "type": "FeatureCollection", "features": features }))
    }

    pub fn with_status(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl HttpClientPort for CannedFeed {
    fn get(&self, url: &str) -> std::result::Result<HttpGetResult, String> {
        self.requested.lock().unwrap().push(url.to_string());
        Ok(HttpGetResult {
            status: self.status,
            bytes: self.body.clone(),
            content_type: "application/json".to_string(),
        })
    }
}

pub fn feature(time: i64, place: &str, mag: f64) -> Value {
    json!({
        "type": "Feature",
        "properties": { "time": time, "place": place, "mag": mag },
        "geometry": { "type": "Point", "coordinates": [-116.8, 33.5, 12.4] }
    })
}

pub fn record(time: i64, place: &str, batch_key: &BatchKey) -> EventRecord {
    EventRecord {
        occurred_at_epoch_millis: time,
        place: place.to_string(),
        magnitude: 2.1,
        longitude: -116.8,
        latitude: 33.5,
        depth: 12.4,
        batch_key: batch_key.to_string(),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn window(start: NaiveDate, end: NaiveDate) -> Result<DateWindow> {
    Ok(DateWindow::new(start, end)?)
}

// 2023-11-12 14:40:00, 2023-11-14 22:13:20, 2023-11-16 02:00:00 (UTC)
pub const NOV_12: i64 = 1_699_800_000_000;
pub const NOV_14: i64 = 1_700_000_000_000;
pub const NOV_16: i64 = 1_700_100_000_000;
