//! Check executor.
//!
//! Runs one fetch → analyze cycle for a target. Every failure, timeout, or
//! panic inside a collaborator ends up in the returned [`CheckResult`];
//! nothing propagates to the calling loop.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::monitor::{
    config::{CheckTimeouts, RetryPolicy},
    error::{MonitorError, MonitorResult},
    provider::{Analyzer, Fetcher},
    retry,
    types::{Analysis, CheckResult, Target},
};

/// Runs checks against the fetcher/analyzer pair it was built with.
#[derive(Clone)]
pub struct CheckExecutor {
    fetcher: Arc<dyn Fetcher>,
    analyzer: Arc<dyn Analyzer>,
    policy: RetryPolicy,
    timeouts: CheckTimeouts,
}

/// Aborts the wrapped task when dropped, so a cancelled check or send does
/// not outlive its loop.
pub(crate) struct AbortOnDrop<T>(pub(crate) JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl CheckExecutor {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        analyzer: Arc<dyn Analyzer>,
        policy: RetryPolicy,
        timeouts: CheckTimeouts,
    ) -> Self {
        Self { fetcher, analyzer, policy, timeouts }
    }

    /// Run one check. Never fails; a failed check has `success == false`.
    pub async fn run(&self, target: &Target) -> CheckResult {
        let this = self.clone();
        let task_target = target.clone();
        let mut task = AbortOnDrop(tokio::spawn(async move { this.check(&task_target).await }));

        match (&mut task.0).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(target_id = %target.id, "Check task aborted: {}", err);
                CheckResult::failure(&target.id, format!("check task aborted: {}", err))
            }
        }
    }

    async fn check(&self, target: &Target) -> CheckResult {
        let budget = self.timeouts.check;
        let outcome = match timeout(budget, self.fetch_and_analyze(target)).await {
            Ok(outcome) => outcome.map_err(|err| err.to_string()),
            Err(_) => Err(format!("check exceeded its {:?} budget", budget)),
        };

        match outcome {
            Ok(analysis) => {
                tracing::info!(
                    target_id = %target.id,
                    fetcher = self.fetcher.fetcher_name(),
                    analyzer = self.analyzer.analyzer_name(),
                    available = analysis.availability,
                    findings = analysis.findings.len(),
                    "Check complete"
                );
                CheckResult::from_analysis(&target.id, analysis)
            }
            Err(message) => {
                tracing::warn!(
                    target_id = %target.id,
                    fetcher = self.fetcher.fetcher_name(),
                    analyzer = self.analyzer.analyzer_name(),
                    "Check failed: {}",
                    message
                );
                CheckResult::failure(&target.id, message)
            }
        }
    }

    async fn fetch_and_analyze(&self, target: &Target) -> MonitorResult<Analysis> {
        let text = retry::execute(&self.policy, "fetch", || self.fetch_once(&target.endpoint)).await?;
        tracing::debug!(target_id = %target.id, chars = text.len(), "Fetched page text");

        retry::execute(&self.policy, "analyze", || self.analyze_once(&text, &target.condition)).await
    }

    async fn fetch_once(&self, endpoint: &str) -> MonitorResult<String> {
        let budget = self.timeouts.fetch;
        timeout(budget, self.fetcher.fetch(endpoint, budget))
            .await
            .unwrap_or_else(|_| {
                Err(MonitorError::transient_fetch(format!("fetch timed out after {:?}", budget)))
            })
    }

    async fn analyze_once(&self, text: &str, condition: &str) -> MonitorResult<Analysis> {
        let budget = self.timeouts.analyze;
        timeout(budget, self.analyzer.analyze(text, condition))
            .await
            .unwrap_or_else(|_| {
                Err(MonitorError::transient_analyze(format!("analysis timed out after {:?}", budget)))
            })
    }
}
