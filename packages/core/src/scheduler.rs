//! Monitoring orchestrator.
//!
//! [`Orchestrator::start_all`] spawns one independent Tokio task per enabled
//! target. Each task runs the loop
//! `STARTING → WAITING → CHECKING → {WAITING | NOTIFYING | ERROR_BACKOFF}`
//! until the shared shutdown signal is raised by [`MonitorHandle::stop`].
//!
//! Loops share nothing mutable: the target, the collaborators and the
//! [`MonitorConfig`] are read-only, and each loop owns its [`AlertState`].
//! A slow, failing, or panicking target therefore never delays another.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::Instrument;

use crate::alerts;
use crate::metrics::MonitorMetrics;
use crate::monitor::{
    dedup::{self, AlertState},
    error::MonitorError,
    executor::AbortOnDrop,
    provider::{Analyzer, DeliveryReport, Fetcher, Notifier},
    retry, window, CheckExecutor, CheckResult, LoopState, MonitorConfig, MonitorResult, Target,
    TargetStatus,
};

/// The external collaborators every loop calls into.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn Fetcher>,
    pub analyzer: Arc<dyn Analyzer>,
    pub notifier: Arc<dyn Notifier>,
}

/// Wall-clock source used for time-window decisions and notification stamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Owns the shared, read-only pieces every target loop is built from.
pub struct Orchestrator {
    collaborators: Collaborators,
    config: Arc<MonitorConfig>,
    metrics: Arc<MonitorMetrics>,
    clock: Clock,
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, config: MonitorConfig, metrics: Arc<MonitorMetrics>) -> Self {
        Self {
            collaborators,
            config: Arc::new(config),
            metrics,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the system clock, e.g. with one driven by Tokio's paused time.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Spawn one loop per enabled target. Must be called inside a Tokio runtime.
    ///
    /// Disabled targets, targets with a zero interval, and repeated ids are
    /// skipped with a warning.
    pub fn start_all(&self, targets: &[Target]) -> MonitorHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let executor = CheckExecutor::new(
            self.collaborators.fetcher.clone(),
            self.collaborators.analyzer.clone(),
            self.config.retry.clone(),
            self.config.timeouts.clone(),
        );

        let mut loops = BTreeMap::new();
        for target in targets {
            if !target.enabled {
                tracing::info!(target_id = %target.id, "Skipping disabled target");
                continue;
            }
            if target.interval.is_zero() {
                tracing::warn!(target_id = %target.id, "Skipping target with zero interval");
                continue;
            }
            if loops.contains_key(&target.id) {
                tracing::warn!(target_id = %target.id, "Skipping repeated target id");
                continue;
            }

            let (status_tx, status_rx) = watch::channel(TargetStatus::starting(&target.id));
            let target_loop = TargetLoop {
                target: target.clone(),
                executor: executor.clone(),
                notifier: self.collaborators.notifier.clone(),
                config: self.config.clone(),
                metrics: self.metrics.clone(),
                clock: self.clock.clone(),
                status: status_tx,
                shutdown: shutdown_rx.clone(),
                consecutive_failures: 0,
            };
            let span = tracing::info_span!("target_loop", target_id = %target.id);
            let task = tokio::spawn(target_loop.run().instrument(span));

            tracing::info!(target_id = %target.id, name = %target.name, "Started monitoring task");
            loops.insert(target.id.clone(), LoopHandle { task, status: status_rx });
        }

        tracing::info!("Monitoring {} targets", loops.len());
        MonitorHandle { shutdown: shutdown_tx, loops }
    }
}

struct LoopHandle {
    task: JoinHandle<()>,
    status: watch::Receiver<TargetStatus>,
}

/// Running loops created by [`Orchestrator::start_all`].
///
/// Dropping the handle without calling [`stop`](Self::stop) also signals
/// every loop to exit, but does not wait for them.
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    loops: BTreeMap<String, LoopHandle>,
}

/// How each loop ended during [`MonitorHandle::stop`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StopReport {
    /// Exited on their own within the grace period.
    pub stopped: Vec<String>,
    /// Still running when the grace period ran out; aborted.
    pub aborted: Vec<String>,
    /// Had already died from a panic.
    pub panicked: Vec<String>,
}

impl MonitorHandle {
    /// Latest status snapshot of one target's loop.
    pub fn status(&self, target_id: &str) -> Option<TargetStatus> {
        self.loops
            .get(target_id)
            .map(|handle| handle.status.borrow().clone())
    }

    /// Snapshots of every loop, ordered by target id.
    pub fn statuses(&self) -> Vec<TargetStatus> {
        self.loops
            .values()
            .map(|handle| handle.status.borrow().clone())
            .collect()
    }

    pub fn target_ids(&self) -> impl Iterator<Item = &str> {
        self.loops.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Signal every loop to stop and wait at most `grace` for them in total.
    ///
    /// Loops observe the signal at their next suspension point, including
    /// mid-check. Whatever is still running at the deadline is aborted.
    pub async fn stop(self, grace: Duration) -> StopReport {
        tracing::info!("Shutdown signal received. Stopping {} loops.", self.loops.len());
        self.shutdown.send_replace(true);

        let deadline = Instant::now() + grace;
        let mut report = StopReport::default();

        for (target_id, mut handle) in self.loops {
            match time::timeout_at(deadline, &mut handle.task).await {
                Ok(Ok(())) => report.stopped.push(target_id),
                Ok(Err(err)) if err.is_panic() => {
                    tracing::error!(target_id = %target_id, "Monitoring loop had panicked");
                    report.panicked.push(target_id);
                }
                Ok(Err(_)) => report.aborted.push(target_id),
                Err(_) => {
                    tracing::warn!(target_id = %target_id, "Loop missed the shutdown grace period, aborting");
                    handle.task.abort();
                    report.aborted.push(target_id);
                }
            }
        }

        tracing::info!(
            "Monitoring stopped: {} clean, {} aborted, {} panicked",
            report.stopped.len(),
            report.aborted.len(),
            report.panicked.len()
        );
        report
    }
}

/// Resolves once shutdown is signalled or the handle is dropped.
async fn cancelled(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// State owned by a single target's task.
struct TargetLoop {
    target: Target,
    executor: CheckExecutor,
    notifier: Arc<dyn Notifier>,
    config: Arc<MonitorConfig>,
    metrics: Arc<MonitorMetrics>,
    clock: Clock,
    status: watch::Sender<TargetStatus>,
    shutdown: watch::Receiver<bool>,
    consecutive_failures: u32,
}

impl TargetLoop {
    async fn run(mut self) {
        tracing::info!(
            interval_secs = self.target.interval.as_secs(),
            window = ?self.target.window,
            "Monitoring loop started"
        );

        let until_open = window::until_open(&self.target, self.now());
        if !until_open.is_zero() {
            tracing::info!("Outside check window, sleeping {:?} until it opens", until_open);
            if !self.sleep(until_open).await {
                return self.stopped();
            }
        }

        // Created on the first successful check.
        let mut alert_state: Option<AlertState> = None;
        let mut next_due = Instant::now();

        loop {
            self.set_state(LoopState::Waiting);
            if !self.sleep_until(next_due).await || !self.wait_for_window().await {
                break;
            }

            self.set_state(LoopState::Checking);
            next_due = Instant::now() + self.target.interval;
            let result = tokio::select! {
                biased;
                _ = cancelled(self.shutdown.clone()) => break,
                result = self.executor.run(&self.target) => result,
            };
            self.record_result(&result);

            if result.success {
                let state = alert_state.get_or_insert_with(|| AlertState::new(&self.target.id));
                state.observe(&result);
                if !state.should_notify(&result) {
                    tracing::debug!("Nothing new to notify");
                    continue;
                }

                self.set_state(LoopState::Notifying);
                tokio::select! {
                    biased;
                    _ = cancelled(self.shutdown.clone()) => break,
                    _ = self.notify(&result) => {}
                }
                let notified_at = self.now();
                state.record_notified(dedup::fingerprint(&result.findings), notified_at);
                self.status.send_modify(|s| s.last_notified_at = Some(notified_at));
            } else if self.config.is_backoff(self.consecutive_failures) {
                let backoff = self.config.error_backoff(self.consecutive_failures);
                tracing::error!(
                    consecutive_failures = self.consecutive_failures,
                    "Repeated check failures, backing off for {:?}",
                    backoff
                );
                self.set_state(LoopState::ErrorBackoff);
                if !self.sleep(backoff).await {
                    break;
                }
            }
        }

        self.stopped();
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn stopped(&self) {
        self.set_state(LoopState::Stopped);
        tracing::info!("Monitoring loop stopped cleanly");
    }

    fn set_state(&self, state: LoopState) {
        self.status.send_modify(|s| s.state = state);
    }

    /// Sleep for `duration`; `false` if shutdown arrived first.
    async fn sleep(&self, duration: Duration) -> bool {
        self.sleep_until(Instant::now() + duration).await
    }

    async fn sleep_until(&self, deadline: Instant) -> bool {
        tokio::select! {
            biased;
            _ = cancelled(self.shutdown.clone()) => false,
            _ = time::sleep_until(deadline) => true,
        }
    }

    /// Re-poll the time window until it opens; `false` on shutdown.
    async fn wait_for_window(&self) -> bool {
        if window::allowed(&self.target, self.now()) {
            return true;
        }
        tracing::info!(
            "Outside check window, re-checking every {:?}",
            self.config.window_poll_interval
        );
        loop {
            if !self.sleep(self.config.window_poll_interval).await {
                return false;
            }
            if window::allowed(&self.target, self.now()) {
                tracing::info!("Check window opened");
                return true;
            }
        }
    }

    fn record_result(&mut self, result: &CheckResult) {
        if result.success {
            if self.consecutive_failures > 0 {
                tracing::info!("Recovered after {} failed checks", self.consecutive_failures);
            }
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
            tracing::warn!(
                consecutive_failures = self.consecutive_failures,
                threshold = self.config.failure_threshold,
                "Check failed: {}",
                result.error.as_deref().unwrap_or("unknown error")
            );
        }

        self.metrics
            .record_check(&self.target.id, result.success, self.consecutive_failures);

        let failures = self.consecutive_failures;
        self.status.send_modify(|s| {
            s.last_check_time = Some(result.timestamp);
            s.last_result = Some(result.clone());
            s.consecutive_failures = failures;
        });
    }

    /// Deliver the alert for `result`. Exhausted retries are logged only.
    async fn notify(&self, result: &CheckResult) {
        let message = alerts::render(&self.target, result);
        let open = result.open_identifiers().join(", ");

        if self.target.recipients.is_empty() {
            tracing::warn!(sections = %open, "Condition met but no recipients configured");
            self.metrics.record_notification(&self.target.id, "skipped");
            return;
        }

        tracing::info!(
            sections = %open,
            notifier = self.notifier.notifier_name(),
            "Condition met, sending notification"
        );
        match retry::execute(&self.config.retry, "notify", || self.send_once(&message)).await {
            Ok(report) if report.is_partial() => {
                tracing::warn!(
                    delivered = report.delivered.len(),
                    failed = report.failed.len(),
                    "Notification partially delivered"
                );
                self.metrics.record_notification(&self.target.id, "partial");
            }
            Ok(report) => {
                tracing::info!(delivered = report.delivered.len(), "Notification sent");
                self.metrics.record_notification(&self.target.id, "delivered");
            }
            Err(err) => {
                tracing::error!("Notification failed, giving up: {}", err);
                self.metrics.record_notification(&self.target.id, "failed");
            }
        }
    }

    /// One send attempt in its own task. A panicking notifier becomes a
    /// permanent delivery error instead of taking the loop down.
    async fn send_once(&self, message: &str) -> MonitorResult<DeliveryReport> {
        let budget = self.config.timeouts.notify;
        let notifier = self.notifier.clone();
        let recipients = self.target.recipients.clone();
        let message = message.to_string();

        let mut task = AbortOnDrop(tokio::spawn(async move {
            time::timeout(budget, notifier.send(&recipients, &message))
                .await
                .unwrap_or_else(|_| {
                    Err(MonitorError::notify(format!("send timed out after {:?}", budget), true))
                })
        }));

        match (&mut task.0).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!("Notifier task aborted: {}", err);
                Err(MonitorError::notify(format!("notifier task aborted: {}", err), false))
            }
        }
    }
}
