use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_FEED_URL, DEFAULT_FILE_PREFIX, DEFAULT_LOG_DIR, DEFAULT_LOOKBACK_DAYS,
    DEFAULT_OUTPUT_DIR, DEFAULT_TIMEOUT_SECONDS, DEFAULT_WAREHOUSE_PATH,
};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub batch: BatchConfig,
    pub warehouse: WarehouseConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub lookback_days: u32,
    pub timeout_seconds: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub output_dir: PathBuf,
    pub file_prefix: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub path: PathBuf,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_WAREHOUSE_PATH),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus listener address; metrics are not exported when unset.
    pub addr: Option<String>,
}

impl Config {
    /// Load `path` if it exists (defaults otherwise), then apply `QUAKE_*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                PipelineError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PipelineError::Config(e.to_string()))
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = env::var("QUAKE_FEED_URL") {
            self.feed.url = url;
        }
        if let Ok(days) = env::var("QUAKE_LOOKBACK_DAYS") {
            self.feed.lookback_days = days.parse().map_err(|_| {
                PipelineError::Config(format!("QUAKE_LOOKBACK_DAYS is not a number: {}", days))
            })?;
        }
        if let Ok(dir) = env::var("QUAKE_OUTPUT_DIR") {
            self.batch.output_dir = PathBuf::from(dir);
        }
        if let Ok(path) = env::var("QUAKE_WAREHOUSE_PATH") {
            self.warehouse.path = PathBuf::from(path);
        }
        if let Ok(dir) = env::var("QUAKE_LOG_DIR") {
            self.logging.dir = PathBuf::from(dir);
        }
        if let Ok(addr) = env::var("QUAKE_METRICS_ADDR") {
            self.metrics.addr = Some(addr);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.feed.url, DEFAULT_FEED_URL);
        assert_eq!(config.feed.lookback_days, 15);
        assert_eq!(config.batch.file_prefix, "earthquake");
        assert!(config.metrics.addr.is_none());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [feed]
            lookback_days = 3

            [warehouse]
            path = "/tmp/quakes.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.feed.lookback_days, 3);
        assert_eq!(config.feed.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(config.warehouse.path, PathBuf::from("/tmp/quakes.db"));
        assert_eq!(config.batch.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn test_malformed_config_is_reported() {
        let err = Config::from_toml("[feed]\nlookback_days = \"many\"").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
