//! Prometheus metrics registry for the monitor.
//!
//! [`MonitorMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it to
//! the orchestrator. Every metric is labelled by target id.

use prometheus::{CounterVec, GaugeVec, Opts, Registry};

/// All monitor-level Prometheus metrics.
pub struct MonitorMetrics {
    /// Checks run, labelled by target and outcome (`success` / `failure`).
    pub checks_total: CounterVec,
    /// Notification attempts, labelled by target and outcome
    /// (`delivered` / `partial` / `failed`).
    pub notifications_total: CounterVec,
    /// Current consecutive failed checks per target.
    pub consecutive_failures: GaugeVec,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl MonitorMetrics {
    /// Create and register all metrics. Returns an error if any metric
    /// name is invalid or duplicated (should not happen in practice).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let checks_total = CounterVec::new(
            Opts::new("seatwatch_checks_total", "Checks run by target and outcome"),
            &["target", "outcome"],
        )?;

        let notifications_total = CounterVec::new(
            Opts::new(
                "seatwatch_notifications_total",
                "Notification attempts by target and outcome",
            ),
            &["target", "outcome"],
        )?;

        let consecutive_failures = GaugeVec::new(
            Opts::new(
                "seatwatch_consecutive_failures",
                "Consecutive failed checks per target",
            ),
            &["target"],
        )?;

        registry.register(Box::new(checks_total.clone()))?;
        registry.register(Box::new(notifications_total.clone()))?;
        registry.register(Box::new(consecutive_failures.clone()))?;

        Ok(Self {
            checks_total,
            notifications_total,
            consecutive_failures,
            registry,
        })
    }

    pub fn record_check(&self, target_id: &str, success: bool, consecutive_failures: u32) {
        let outcome = if success { "success" } else { "failure" };
        self.checks_total.with_label_values(&[target_id, outcome]).inc();
        self.consecutive_failures
            .with_label_values(&[target_id])
            .set(f64::from(consecutive_failures));
    }

    pub fn record_notification(&self, target_id: &str, outcome: &str) {
        self.notifications_total
            .with_label_values(&[target_id, outcome])
            .inc();
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}
