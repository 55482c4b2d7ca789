use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::FixedOffset;
use tracing::trace;

pub const DEFAULT_SOURCE_URL: &str = "https://api-portal.kaia.io/api/v1/mission/total";

const SOURCE_URL_ENV: &str = "POINTS_SOURCE_URL";
const DATA_FILE_ENV: &str = "POINTS_DATA_FILE";
const STATS_FILE_ENV: &str = "POINTS_STATS_FILE";
const LOG_FILE_ENV: &str = "POINTS_LOG_FILE";
const INTERVAL_ENV: &str = "POINTS_INTERVAL_SECS";
const UTC_OFFSET_ENV: &str = "POINTS_UTC_OFFSET_HOURS";

/// Calendar days are bucketed by whole-hour offsets inside this range
const MAX_UTC_OFFSET_HOURS: i32 = 23;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Upstream endpoint returning the `{ "data": { ... } }` pool document
    #[serde(default = "default_source_url")]
    pub source_url: String,

    /// Snapshot log file
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Daily statistics file
    #[serde(default = "default_stats_file")]
    pub stats_file: PathBuf,

    /// Seconds between two polls
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Seconds to wait after a cycle failed for a reason other than fetching
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Offset of the zone whose calendar days the statistics are bucketed by
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,

    /// Optional file that receives a copy of the log output
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            data_file: default_data_file(),
            stats_file: default_stats_file(),
            interval_secs: default_interval(),
            error_backoff_secs: default_error_backoff(),
            request_timeout_secs: default_request_timeout(),
            utc_offset_hours: default_utc_offset_hours(),
            log_file: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_secs == 0 {
            anyhow::bail!("interval_secs must be greater than zero");
        }
        if self.error_backoff_secs == 0 {
            anyhow::bail!("error_backoff_secs must be greater than zero");
        }
        if self.error_backoff_secs >= self.interval_secs {
            anyhow::bail!(
                "error_backoff_secs ({}) must be shorter than interval_secs ({})",
                self.error_backoff_secs,
                self.interval_secs
            );
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }
        self.utc_offset()?;
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn utc_offset(&self) -> anyhow::Result<FixedOffset> {
        if !(-MAX_UTC_OFFSET_HOURS..=MAX_UTC_OFFSET_HOURS).contains(&self.utc_offset_hours) {
            anyhow::bail!(
                "utc_offset_hours must be within ±{MAX_UTC_OFFSET_HOURS}, got {}",
                self.utc_offset_hours
            );
        }
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .with_context(|| format!("invalid utc_offset_hours: {}", self.utc_offset_hours))
    }

    /// Override settings from `POINTS_*` environment variables (a `.env` file
    /// is loaded into the environment by the binary)
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(url) = lookup(SOURCE_URL_ENV) {
            self.source_url = url;
        }
        if let Some(path) = lookup(DATA_FILE_ENV) {
            self.data_file = path.into();
        }
        if let Some(path) = lookup(STATS_FILE_ENV) {
            self.stats_file = path.into();
        }
        if let Some(path) = lookup(LOG_FILE_ENV) {
            self.log_file = Some(path.into());
        }
        if let Some(raw) = lookup(INTERVAL_ENV) {
            self.interval_secs = raw
                .parse()
                .with_context(|| format!("invalid {INTERVAL_ENV}: {raw}"))?;
        }
        if let Some(raw) = lookup(UTC_OFFSET_ENV) {
            self.utc_offset_hours = raw
                .parse()
                .with_context(|| format!("invalid {UTC_OFFSET_ENV}: {raw}"))?;
        }
        Ok(())
    }
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_data_file() -> PathBuf {
    PathBuf::from("./kaia_pool_data.json")
}

fn default_stats_file() -> PathBuf {
    PathBuf::from("./kaia_daily_stats.json")
}

fn default_interval() -> u64 {
    3600
}

fn default_error_backoff() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    30
}

fn default_utc_offset_hours() -> i32 {
    9
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config {path}"))?;
    let config: Config = serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))?;
    trace!("loaded config: {config:?}");
    config.validate()?;
    Ok(config)
}
