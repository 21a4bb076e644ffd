use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::AppError;
use crate::monitor::{CheckTimeouts, MonitorConfig, RetryPolicy};
use crate::services::telegram;

pub const DEFAULT_TARGETS_FILE: &str = "config/targets.json";

#[derive(Clone)]
pub struct Config {
    pub targets_file: PathBuf,
    pub analyzer_url: String,
    pub telegram_bot_token: String,
    /// Recipient for targets that list none of their own.
    pub telegram_chat_id: Option<String>,
    pub telegram_api_url: String,
    pub monitor: MonitorConfig,
    pub shutdown_grace: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let analyzer_url = get("ANALYZER_URL").ok_or("ANALYZER_URL is required")?;
        let telegram_bot_token =
            get("TELEGRAM_BOT_TOKEN").ok_or("TELEGRAM_BOT_TOKEN is required")?;

        let defaults = MonitorConfig::default();
        let retry = RetryPolicy {
            max_attempts: parse_or(&get, "RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts)?,
            base_delay: Duration::from_millis(parse_or(&get, "RETRY_BASE_DELAY_MS", 2000)?),
            multiplier: parse_or(&get, "RETRY_MULTIPLIER", defaults.retry.multiplier)?,
            max_delay: seconds_or(&get, "RETRY_MAX_DELAY_SECONDS", defaults.retry.max_delay)?,
            jitter_fraction: parse_or(&get, "RETRY_JITTER_FRACTION", defaults.retry.jitter_fraction)?,
        };
        if retry.max_attempts == 0 {
            return Err("RETRY_MAX_ATTEMPTS must be at least 1".to_string());
        }
        if retry.multiplier < 1.0 {
            return Err("RETRY_MULTIPLIER must be at least 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&retry.jitter_fraction) {
            return Err("RETRY_JITTER_FRACTION must be between 0 and 1".to_string());
        }

        let timeouts = CheckTimeouts {
            fetch: seconds_or(&get, "FETCH_TIMEOUT_SECONDS", defaults.timeouts.fetch)?,
            analyze: seconds_or(&get, "ANALYZE_TIMEOUT_SECONDS", defaults.timeouts.analyze)?,
            notify: seconds_or(&get, "NOTIFY_TIMEOUT_SECONDS", defaults.timeouts.notify)?,
            check: seconds_or(&get, "CHECK_TIMEOUT_SECONDS", defaults.timeouts.check)?,
        };

        let monitor = MonitorConfig {
            retry,
            timeouts,
            failure_threshold: parse_or(&get, "FAILURE_THRESHOLD", defaults.failure_threshold)?,
            error_backoff_base: seconds_or(&get, "ERROR_BACKOFF_SECONDS", defaults.error_backoff_base)?,
            error_backoff_max: seconds_or(&get, "ERROR_BACKOFF_MAX_SECONDS", defaults.error_backoff_max)?,
            window_poll_interval: seconds_or(&get, "WINDOW_POLL_SECONDS", defaults.window_poll_interval)?,
        };
        if monitor.window_poll_interval.is_zero() {
            return Err("WINDOW_POLL_SECONDS must be greater than 0".to_string());
        }

        Ok(Self {
            targets_file: get("TARGETS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGETS_FILE)),
            analyzer_url,
            telegram_bot_token,
            telegram_chat_id: get("TELEGRAM_CHAT_ID"),
            telegram_api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| telegram::DEFAULT_API_URL.to_string()),
            monitor,
            shutdown_grace: seconds_or(&get, "SHUTDOWN_GRACE_SECONDS", Duration::from_secs(5))?,
        })
    }

    /// Command-line flags win over the environment.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(path) = &cli.targets {
            self.targets_file = path.clone();
        }
        if let Some(url) = &cli.analyzer_url {
            self.analyzer_url = url.clone();
        }
        if let Some(secs) = cli.grace_seconds {
            self.shutdown_grace = Duration::from_secs(secs);
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("targets_file", &self.targets_file)
            .field("analyzer_url", &self.analyzer_url)
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("telegram_api_url", &self.telegram_api_url)
            .field("monitor", &self.monitor)
            .field("shutdown_grace", &self.shutdown_grace)
            .finish()
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number, got {:?}", key, raw)),
        None => Ok(default),
    }
}

fn seconds_or<G>(get: &G, key: &str, default: Duration) -> Result<Duration, String>
where
    G: Fn(&str) -> Option<String>,
{
    parse_or(get, key, default.as_secs()).map(Duration::from_secs)
}

/// Accepted layouts of the targets file. Entries stay untyped here; the
/// registry deserializes and validates each one separately.
#[derive(Deserialize)]
#[serde(untagged)]
enum TargetsFile {
    Wrapped { targets: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

/// Parse a targets document: `{"targets": [...]}` or a bare array.
pub fn parse_targets(json: &str) -> Result<Vec<serde_json::Value>, serde_json::Error> {
    Ok(match serde_json::from_str::<TargetsFile>(json)? {
        TargetsFile::Wrapped { targets } => targets,
        TargetsFile::Bare(targets) => targets,
    })
}

pub fn read_targets(path: &Path) -> Result<Vec<serde_json::Value>, AppError> {
    let json = std::fs::read_to_string(path).map_err(|source| AppError::TargetsFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_targets(&json).map_err(|source| AppError::TargetsParse {
        path: path.to_path_buf(),
        source,
    })
}
