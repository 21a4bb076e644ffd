//! Collaborator Interfaces
//!
//! The monitoring core never fetches pages, classifies content, or delivers
//! messages itself. It drives these three traits instead.

use async_trait::async_trait;
use std::time::Duration;

use crate::monitor::{error::MonitorResult, types::Analysis};

/// Retrieves the text of a target page.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `endpoint` and return its text.
    ///
    /// Network errors and timeouts must be reported as
    /// [`MonitorError::TransientFetch`](crate::monitor::MonitorError::TransientFetch),
    /// bad endpoints as `PermanentFetch`.
    async fn fetch(&self, endpoint: &str, timeout: Duration) -> MonitorResult<String>;

    /// Get the name of this fetcher for logging/debugging
    fn fetcher_name(&self) -> &str {
        "fetcher"
    }
}

/// Decides whether page text satisfies a natural-language condition.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Ambiguous input yields `availability = false`, not an error.
    async fn analyze(&self, text: &str, condition: &str) -> MonitorResult<Analysis>;

    fn analyzer_name(&self) -> &str {
        "analyzer"
    }
}

/// Delivers an alert message to a list of recipients.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// `Ok` when at least one recipient (or none were given) received the
    /// message; partial failures are listed in the report. `Err` when every
    /// recipient failed.
    async fn send(&self, recipients: &[String], message: &str) -> MonitorResult<DeliveryReport>;

    fn notifier_name(&self) -> &str {
        "notifier"
    }
}

/// A recipient that did not receive the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDelivery {
    pub recipient: String,
    pub error: String,
}

/// Per-recipient outcome of one send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    pub failed: Vec<FailedDelivery>,
}

impl DeliveryReport {
    /// Some recipients received the message and some did not.
    pub fn is_partial(&self) -> bool {
        !self.delivered.is_empty() && !self.failed.is_empty()
    }
}
