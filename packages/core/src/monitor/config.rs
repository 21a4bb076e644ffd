//! Configuration for the monitoring loops

use std::time::Duration;

/// Bounded exponential backoff with jitter.
///
/// Stateless; one value is shared read-only by every target loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Upper bound of the uniform jitter, as a fraction of the delay.
    pub jitter_fraction: f64,
}

/// Timeouts for the external collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckTimeouts {
    /// Per fetch attempt.
    pub fetch: Duration,
    /// Per analysis attempt.
    pub analyze: Duration,
    /// Per send attempt.
    pub notify: Duration,
    /// Whole check: every fetch and analysis attempt plus retry delays.
    pub check: Duration,
}

/// Settings shared by every target loop of one orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub retry: RetryPolicy,
    pub timeouts: CheckTimeouts,
    /// Consecutive failed checks before a loop enters error backoff.
    pub failure_threshold: u32,
    pub error_backoff_base: Duration,
    pub error_backoff_max: Duration,
    /// How often a loop re-checks a closed time window.
    pub window_poll_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter_fraction: 0.1,
        }
    }
}

impl Default for CheckTimeouts {
    fn default() -> Self {
        Self {
            fetch: Duration::from_secs(30),
            analyze: Duration::from_secs(10),
            notify: Duration::from_secs(30),
            check: Duration::from_secs(120),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            timeouts: CheckTimeouts::default(),
            failure_threshold: 3,
            error_backoff_base: Duration::from_secs(60),
            error_backoff_max: Duration::from_secs(30 * 60),
            window_poll_interval: Duration::from_secs(60),
        }
    }
}

impl MonitorConfig {
    /// Sleep applied once `consecutive_failures` has reached the threshold.
    ///
    /// Doubles for every failure past the threshold, capped at `error_backoff_max`.
    pub fn error_backoff(&self, consecutive_failures: u32) -> Duration {
        let threshold = self.failure_threshold.max(1);
        let exponent = consecutive_failures.saturating_sub(threshold).min(16);
        self.error_backoff_base
            .saturating_mul(1u32 << exponent)
            .min(self.error_backoff_max)
    }

    /// Whether `consecutive_failures` puts the loop into error backoff.
    pub fn is_backoff(&self, consecutive_failures: u32) -> bool {
        consecutive_failures >= self.failure_threshold.max(1)
    }
}
