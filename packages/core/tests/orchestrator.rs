//! Orchestrator behaviour through the public API, with scripted collaborators
//! and paused Tokio time.

use std::sync::Arc;
use std::time::Duration;

use seatwatch::config::parse_targets;
use seatwatch::metrics::MonitorMetrics;
use seatwatch::monitor::{
    registry, Analysis, CheckTimeouts, Finding, LoopState, MonitorConfig, MonitorError,
    RetryPolicy, Target,
};
use seatwatch::scheduler::{Collaborators, Orchestrator};
use seatwatch::services::mock::{MockAnalyzer, MockFetcher, MockNotifier, RoutedFetcher};
use tokio::time::{self, Instant};

fn config() -> MonitorConfig {
    MonitorConfig {
        retry: RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
            jitter_fraction: 0.0,
        },
        timeouts: CheckTimeouts::default(),
        failure_threshold: 3,
        error_backoff_base: Duration::from_secs(60),
        error_backoff_max: Duration::from_secs(600),
        window_poll_interval: Duration::from_secs(60),
    }
}

fn target(id: &str, interval_secs: u64) -> Target {
    Target {
        id: id.to_string(),
        name: id.to_string(),
        endpoint: format!("https://pages.test/{}", id),
        condition: "seats are open".to_string(),
        interval: Duration::from_secs(interval_secs),
        enabled: true,
        window: None,
        recipients: vec!["1001".to_string()],
        notification_template: None,
    }
}

fn orchestrator(
    fetcher: RoutedFetcher,
    analyzer: MockAnalyzer,
    notifier: Arc<MockNotifier>,
) -> Orchestrator {
    Orchestrator::new(
        Collaborators {
            fetcher: Arc::new(fetcher),
            analyzer: Arc::new(analyzer),
            notifier,
        },
        config(),
        Arc::new(MonitorMetrics::new().unwrap()),
    )
}

#[tokio::test(start_paused = true)]
async fn failing_slow_and_panicking_targets_do_not_delay_healthy_one() {
    let healthy = Arc::new(MockFetcher::new().with_text("page"));
    let slow = Arc::new(
        MockFetcher::new()
            .with_text("page")
            .with_delay(Duration::from_secs(25)),
    );
    let broken = Arc::new(MockFetcher::new().with_error(MonitorError::permanent_fetch("410 Gone")));
    let panicking = Arc::new(MockFetcher::new().panicking());

    let fetcher = RoutedFetcher::new()
        .route("https://pages.test/healthy", healthy.clone())
        .route("https://pages.test/slow", slow.clone())
        .route("https://pages.test/broken", broken.clone())
        .route("https://pages.test/panicking", panicking.clone());
    let orch = orchestrator(fetcher, MockAnalyzer::new(), Arc::new(MockNotifier::new()));

    let handle = orch.start_all(&[
        target("healthy", 10),
        target("slow", 10),
        target("broken", 10),
        target("panicking", 10),
    ]);
    time::sleep(Duration::from_secs(95)).await;

    // 0s, 10s, ... 90s.
    assert_eq!(healthy.call_count().await, 10);
    assert!(slow.call_count().await >= 3);
    assert!(broken.call_count().await < 10);

    let panicking_status = handle.status("panicking").unwrap();
    assert!(panicking_status.consecutive_failures >= 3);
    assert!(!panicking_status.last_result.unwrap().success);

    let report = handle.stop(Duration::from_secs(5)).await;
    assert_eq!(report.stopped.len(), 4);
    assert!(report.aborted.is_empty());
    assert!(report.panicked.is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_returns_within_grace_and_no_check_starts_afterwards() {
    let quick = Arc::new(MockFetcher::new().with_text("page"));
    let in_flight = Arc::new(
        MockFetcher::new()
            .with_text("page")
            .with_delay(Duration::from_secs(20)),
    );
    let fetcher = RoutedFetcher::new()
        .route("https://pages.test/quick", quick.clone())
        .route("https://pages.test/in-flight", in_flight.clone());
    let orch = orchestrator(fetcher, MockAnalyzer::new(), Arc::new(MockNotifier::new()));

    let handle = orch.start_all(&[target("quick", 5), target("in-flight", 5)]);
    time::sleep(Duration::from_secs(7)).await;
    assert_eq!(handle.status("in-flight").unwrap().state, LoopState::Checking);

    let started = Instant::now();
    let report = handle.stop(Duration::from_secs(5)).await;
    assert!(started.elapsed() <= Duration::from_secs(5));
    assert_eq!(report.stopped.len(), 2);

    let quick_calls = quick.call_count().await;
    let in_flight_calls = in_flight.call_count().await;
    time::sleep(Duration::from_secs(120)).await;
    assert_eq!(quick.call_count().await, quick_calls);
    assert_eq!(in_flight.call_count().await, in_flight_calls);
}

#[tokio::test(start_paused = true)]
async fn loads_targets_file_and_notifies_recipients() {
    let json = r#"{
        "targets": [
            {
                "id": "cmsc131",
                "name": "CMSC131",
                "url": "https://pages.test/cmsc131",
                "user_instructions": "any section has open seats",
                "check_interval_seconds": 60,
                "recipients": ["1001", "1002"],
                "notification_message": "{name}: {sections}"
            },
            {"id": "paused", "url": "https://pages.test/paused", "condition": "x", "enabled": false},
            {"id": "broken", "url": "https://pages.test/broken", "condition": "x", "check_interval_seconds": 0}
        ]
    }"#;
    let load = registry::load_json(parse_targets(json).unwrap());
    assert_eq!(load.errors.len(), 1);

    let fetcher = RoutedFetcher::new().route(
        "https://pages.test/cmsc131",
        Arc::new(MockFetcher::new().with_text("CMSC131 0101 open 2")),
    );
    let analyzer = MockAnalyzer::new().with_analysis(Analysis {
        availability: true,
        findings: vec![Finding {
            identifier: "0101".to_string(),
            open_count: 2,
            total_count: 40,
            waitlist_count: 0,
        }],
        summary: "0101 has 2 open seats".to_string(),
    });
    let notifier = Arc::new(MockNotifier::new());
    let orch = orchestrator(fetcher, analyzer, notifier.clone());

    let handle = orch.start_all(&load.targets);
    assert_eq!(handle.target_ids().collect::<Vec<_>>(), vec!["cmsc131"]);

    time::sleep(Duration::from_secs(150)).await;
    handle.stop(Duration::from_secs(1)).await;

    let sent = notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, vec!["1001".to_string(), "1002".to_string()]);
    assert_eq!(sent[0].1, "CMSC131: 0101");
}
