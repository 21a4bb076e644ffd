//! Error types for target monitoring

use thiserror::Error;

/// Errors raised while loading targets or running a check.
///
/// Only [`MonitorError::Config`] is raised at load time; every other
/// variant is captured by the owning target loop and never escapes it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Configuration error for target '{target_id}': {message}")]
    Config { target_id: String, message: String },

    #[error("Transient fetch error: {message}")]
    TransientFetch { message: String },

    #[error("Permanent fetch error: {message}")]
    PermanentFetch { message: String },

    #[error("Transient analyze error: {message}")]
    TransientAnalyze { message: String },

    #[error("Permanent analyze error: {message}")]
    PermanentAnalyze { message: String },

    #[error("Notification error: {message}")]
    Notify { message: String, transient: bool },
}

/// Classifies a failure as worth retrying or not.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

impl Retryable for MonitorError {
    fn is_transient(&self) -> bool {
        match self {
            Self::TransientFetch { .. } | Self::TransientAnalyze { .. } => true,
            Self::Notify { transient, .. } => *transient,
            Self::Config { .. } | Self::PermanentFetch { .. } | Self::PermanentAnalyze { .. } => {
                false
            }
        }
    }
}

impl MonitorError {
    pub fn config(target_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config { target_id: target_id.into(), message: message.into() }
    }

    pub fn transient_fetch(message: impl Into<String>) -> Self {
        Self::TransientFetch { message: message.into() }
    }

    pub fn permanent_fetch(message: impl Into<String>) -> Self {
        Self::PermanentFetch { message: message.into() }
    }

    pub fn transient_analyze(message: impl Into<String>) -> Self {
        Self::TransientAnalyze { message: message.into() }
    }

    pub fn permanent_analyze(message: impl Into<String>) -> Self {
        Self::PermanentAnalyze { message: message.into() }
    }

    pub fn notify(message: impl Into<String>, transient: bool) -> Self {
        Self::Notify { message: message.into(), transient }
    }
}

/// Result type for monitoring operations
pub type MonitorResult<T> = Result<T, MonitorError>;
