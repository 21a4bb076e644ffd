use std::path::PathBuf;

use thiserror::Error;

/// Unified startup error.
///
/// Anything that stops the process before the monitoring loops start ends
/// up here. Per-target problems never do; those are `MonitorError`s.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Cannot read targets file {path}: {source}")]
    TargetsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse targets file {path}: {source}")]
    TargetsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
