//! Alert deduplication.
//!
//! A positive result is only worth a notification when its set of open
//! identifiers differs from the last one notified. A successful negative
//! result clears the stored fingerprint so that a later reopening with the
//! same identifiers notifies again.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};

use crate::monitor::types::{CheckResult, Finding};

/// Stable signature over the identifiers with a positive open count.
///
/// Order and duplicates in `findings` do not affect the result. The value
/// is only compared within one process, never persisted.
pub fn fingerprint(findings: &[Finding]) -> String {
    let open: BTreeSet<&str> = findings
        .iter()
        .filter(|f| f.open_count > 0)
        .map(|f| f.identifier.as_str())
        .collect();

    let mut hasher = DefaultHasher::new();
    open.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Per-target notification memory. Owned by that target's loop only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertState {
    pub target_id: String,
    pub fingerprint: Option<String>,
    pub last_notified_at: Option<DateTime<Utc>>,
}

impl AlertState {
    pub fn new(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            fingerprint: None,
            last_notified_at: None,
        }
    }

    /// True when `result` is available and its fingerprint is new.
    pub fn should_notify(&self, result: &CheckResult) -> bool {
        if !result.success || !result.availability {
            return false;
        }
        self.fingerprint.as_deref() != Some(fingerprint(&result.findings).as_str())
    }

    /// Fold a check result into the state before deciding.
    ///
    /// Only a successful negative result counts as a closure; failed
    /// checks leave the fingerprint alone.
    pub fn observe(&mut self, result: &CheckResult) {
        if result.success && !result.availability && self.fingerprint.take().is_some() {
            tracing::info!(
                target_id = %self.target_id,
                "Condition closed, cleared notification fingerprint"
            );
        }
    }

    /// Remember what was just notified (delivered or not).
    pub fn record_notified(&mut self, fingerprint: String, at: DateTime<Utc>) {
        self.fingerprint = Some(fingerprint);
        self.last_notified_at = Some(at);
    }
}
