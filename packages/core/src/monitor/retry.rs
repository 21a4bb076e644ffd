//! Retry/backoff controller.
//!
//! Every call to [`execute`] is an independent retry sequence; the only
//! input shared between calls is the read-only [`RetryPolicy`].

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::monitor::{config::RetryPolicy, error::Retryable};

impl RetryPolicy {
    /// Pre-jitter delay after attempt `attempt` (1-based) fails:
    /// `base * multiplier^(attempt - 1)`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let secs = self.base_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// `delay` plus uniform jitter in `[0, delay * jitter_fraction]`.
    pub fn with_jitter(&self, delay: Duration) -> Duration {
        let spread = delay.as_secs_f64() * self.jitter_fraction.clamp(0.0, 1.0);
        if spread <= 0.0 {
            return delay;
        }
        let jitter = rand::thread_rng().gen_range(0.0..=spread);
        delay + Duration::from_secs_f64(jitter)
    }
}

/// Run `operation` until it succeeds, fails permanently, or the policy's
/// attempts are used up. The last error is returned on failure.
pub async fn execute<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("{} succeeded on attempt {}/{}", label, attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(err) if !err.is_transient() => {
                tracing::warn!("{} failed permanently, not retrying: {}", label, err);
                return Err(err);
            }
            Err(err) if attempt >= max_attempts => {
                tracing::warn!("{} failed after {} attempts: {}", label, attempt, err);
                return Err(err);
            }
            Err(err) => {
                let delay = policy.with_jitter(policy.delay_for_attempt(attempt));
                tracing::debug!(
                    "{} attempt {}/{} failed ({}), retrying in {:?}",
                    label,
                    attempt,
                    max_attempts,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
