use crate::app::ports::{HttpClientPort, HttpGetResult};
use crate::error::{PipelineError, Result};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

pub struct ReqwestHttp {
    client: reqwest::blocking::Client,
}

impl ReqwestHttp {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpClientPort for ReqwestHttp {
    fn get(&self, url: &str) -> std::result::Result<HttpGetResult, String> {
        let resp = self.client.get(url).send().map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = resp.bytes().map_err(|e| e.to_string())?.to_vec();
        Ok(HttpGetResult { status, bytes, content_type })
    }
}
