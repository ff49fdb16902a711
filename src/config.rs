use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Remote aggregation service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Reviews requested per page (`num` query parameter)
    pub page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gplayapi.cashlessconsumer.in".to_string(),
            page_size: 100,
        }
    }
}

/// Where harvested documents and the app list live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub output_dir: PathBuf,
    pub app_list: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("../raw-data/reviews"),
            app_list: PathBuf::from("../raw-data/applist.json"),
        }
    }
}

/// Incremental review sync settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Days subtracted from today to get the incremental cutoff date
    pub cutoff_days: u32,
    /// Only review keys starting with this prefix are counted as criteria
    pub criteria_prefix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cutoff_days: 2,
            criteria_prefix: "vaf".to_string(),
        }
    }
}

impl SyncConfig {
    /// Date boundary for incremental fetches: reviews must be strictly newer
    pub fn cutoff_date(&self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(i64::from(self.cutoff_days))
    }
}

/// Log file configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// When set, logs are also written to a timestamped file in this directory
    pub directory: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!(path = %path.display(), "Loaded configuration");

        Ok(config)
    }

    /// Load configuration from the default location (harvest.yml)
    pub fn load_default() -> Result<Self> {
        Self::load("harvest.yml")
    }
}
