//! Crawl configuration.
//!
//! Values come from three layers, later ones winning:
//!
//! 1. Built-in defaults ([`CrawlConfig::default`])
//! 2. An optional YAML file (`--config crawl.yaml`)
//! 3. Command-line flags and environment variables (see [`crate::cli`])
//!
//! Any key may be omitted from the YAML file.
//!
//! ```yaml
//! year_min: 2015
//! year_max: 2016
//! pacing_min_ms: 800
//! pacing_max_ms: 1500
//! browserless_url: http://localhost:3000
//! ```

use crate::periods::PeriodRange;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Root of the monthly history pages.
    pub history_base_url: String,
    /// Root of the current-conditions pages.
    pub current_base_url: String,
    /// Page listing every city, used by the `cities` bootstrap.
    pub catalog_index_url: String,

    pub year_min: i32,
    pub year_max: i32,

    /// Politeness delay bounds, in milliseconds.
    pub pacing_min_ms: u64,
    pub pacing_max_ms: u64,

    /// "Show more" control on history pages. Empty or absent disables expand.
    pub expand_selector: Option<String>,
    /// Wait after clicking the expand control.
    pub expand_settle_ms: u64,

    pub user_agent: String,
    pub request_timeout_secs: u64,

    /// Browserless endpoint; static HTTP is used when unset.
    pub browserless_url: Option<String>,
    #[serde(skip_serializing)]
    pub browserless_token: Option<String>,

    pub catalog_path: PathBuf,
    pub output_dir: PathBuf,
    pub history_file: String,
    pub current_file: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            history_base_url: "https://lishi.tianqi.com/".to_string(),
            current_base_url: "https://www.tianqi.com/".to_string(),
            catalog_index_url: "https://lishi.tianqi.com/".to_string(),
            year_min: 2011,
            year_max: 2024,
            pacing_min_ms: 500,
            pacing_max_ms: 1000,
            expand_selector: Some(".lishidesc2".to_string()),
            expand_settle_ms: 750,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            browserless_url: None,
            browserless_token: None,
            catalog_path: PathBuf::from("cities_all.csv"),
            output_dir: PathBuf::from("weather_data"),
            history_file: "weather_data.csv".to_string(),
            current_file: "current_weather.csv".to_string(),
        }
    }
}

impl CrawlConfig {
    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.year_min > self.year_max {
            return Err(ConfigError::Invalid(format!(
                "year_min ({}) is after year_max ({})",
                self.year_min, self.year_max
            )));
        }
        if self.pacing_min_ms > self.pacing_max_ms {
            return Err(ConfigError::Invalid(format!(
                "pacing_min_ms ({}) is larger than pacing_max_ms ({})",
                self.pacing_min_ms, self.pacing_max_ms
            )));
        }
        Ok(())
    }

    pub fn period_range(&self) -> Result<PeriodRange, ConfigError> {
        PeriodRange::new(self.year_min, self.year_max).ok_or_else(|| {
            ConfigError::Invalid(format!("empty year range {}..={}", self.year_min, self.year_max))
        })
    }

    pub fn pacing_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.pacing_min_ms),
            Duration::from_millis(self.pacing_max_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn expand_settle(&self) -> Duration {
        Duration::from_millis(self.expand_settle_ms)
    }

    pub fn history_path(&self) -> PathBuf {
        self.output_dir.join(&self.history_file)
    }

    pub fn current_path(&self) -> PathBuf {
        self.output_dir.join(&self.current_file)
    }
}

/// Load a YAML config file over the built-in defaults.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<CrawlConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Loaded configuration");
    Ok(config)
}

fn parse_config(text: &str) -> Result<CrawlConfig, serde_yaml::Error> {
    if text.trim().is_empty() {
        return Ok(CrawlConfig::default());
    }
    serde_yaml::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CrawlConfig::default();
        config.validate().unwrap();
        assert_eq!(config.period_range().unwrap().len(), 14 * 12);
        assert_eq!(
            config.pacing_bounds(),
            (Duration::from_millis(500), Duration::from_millis(1000))
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = parse_config("year_min: 2020\nyear_max: 2020\nbrowserless_url: http://localhost:3000\n").unwrap();
        assert_eq!(config.year_min, 2020);
        assert_eq!(config.year_max, 2020);
        assert_eq!(config.browserless_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.pacing_min_ms, 500);
        assert_eq!(config.history_path(), PathBuf::from("weather_data/weather_data.csv"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(parse_config("").unwrap(), CrawlConfig::default());
    }

    #[test]
    fn test_unknown_type_is_parse_error() {
        assert!(parse_config("year_min: soon\n").is_err());
    }

    #[test]
    fn test_inverted_bounds_are_invalid() {
        let config = CrawlConfig {
            year_min: 2024,
            year_max: 2011,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = CrawlConfig {
            pacing_min_ms: 2000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.yaml");
        std::fs::write(&path, "pacing_min_ms: 100\npacing_max_ms: 200\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.pacing_bounds().1, Duration::from_millis(200));

        let missing = load_config(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
