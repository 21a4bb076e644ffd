//! Core data types for target monitoring

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A validated monitoring target.
///
/// Disabled targets may carry an empty `endpoint` / `condition`; enabled
/// targets never do (see [`crate::monitor::registry::load`]).
#[derive(Debug, Clone)]
pub struct Target {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub condition: String,
    pub interval: Duration,
    pub enabled: bool,
    pub window: Option<TimeWindow>,
    pub recipients: Vec<String>,
    pub notification_template: Option<String>,
}

/// Daily hour range, evaluated in `timezone`. `start_hour > end_hour` wraps midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub timezone: Tz,
}

/// One identifier reported by the analyzer (a course section, a listing, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub identifier: String,
    pub open_count: u32,
    pub total_count: u32,
    pub waitlist_count: u32,
}

/// Validated analyzer output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub availability: bool,
    pub findings: Vec<Finding>,
    pub summary: String,
}

impl Analysis {
    /// Identifiers whose open count is positive, in reported order.
    pub fn open_identifiers(&self) -> Vec<&str> {
        open_identifiers(&self.findings)
    }
}

pub(crate) fn open_identifiers(findings: &[Finding]) -> Vec<&str> {
    findings
        .iter()
        .filter(|f| f.open_count > 0)
        .map(|f| f.identifier.as_str())
        .collect()
}

/// Outcome of one fetch → analyze cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub target_id: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub availability: bool,
    pub findings: Vec<Finding>,
    pub summary: String,
    pub error: Option<String>,
}

impl CheckResult {
    pub fn from_analysis(target_id: impl Into<String>, analysis: Analysis) -> Self {
        Self {
            target_id: target_id.into(),
            timestamp: Utc::now(),
            success: true,
            availability: analysis.availability,
            findings: analysis.findings,
            summary: analysis.summary,
            error: None,
        }
    }

    /// A failed check. Availability is always `false`.
    pub fn failure(target_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            timestamp: Utc::now(),
            success: false,
            availability: false,
            findings: Vec::new(),
            summary: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn open_identifiers(&self) -> Vec<&str> {
        open_identifiers(&self.findings)
    }
}

/// States of a per-target monitoring loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopState {
    Starting,
    Waiting,
    Checking,
    Notifying,
    ErrorBackoff,
    Stopped,
}

/// Read-only snapshot of a target loop, for external health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct TargetStatus {
    pub target_id: String,
    pub state: LoopState,
    pub last_check_time: Option<DateTime<Utc>>,
    pub last_result: Option<CheckResult>,
    pub consecutive_failures: u32,
    pub last_notified_at: Option<DateTime<Utc>>,
}

impl TargetStatus {
    pub fn starting(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            state: LoopState::Starting,
            last_check_time: None,
            last_result: None,
            consecutive_failures: 0,
            last_notified_at: None,
        }
    }
}
