//! Scripted in-memory collaborators.
//!
//! Each mock replays its scripted responses in order and repeats the last
//! one once the script is exhausted. Calls are recorded so tests can assert
//! on what the monitoring loop asked for and when.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::monitor::{
    error::{MonitorError, MonitorResult},
    provider::{Analyzer, DeliveryReport, Fetcher, Notifier},
    types::Analysis,
};

struct Script<T> {
    responses: Vec<T>,
    next: usize,
}

impl<T: Clone> Script<T> {
    fn new() -> Self {
        Self { responses: Vec::new(), next: 0 }
    }

    fn next(&mut self) -> Option<T> {
        let response = self
            .responses
            .get(self.next)
            .or_else(|| self.responses.last())
            .cloned();
        self.next += 1;
        response
    }
}

/// Fetcher returning scripted page text or errors.
pub struct MockFetcher {
    script: Mutex<Script<MonitorResult<String>>>,
    calls: Mutex<Vec<Instant>>,
    delay: Option<Duration>,
    panics: bool,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
            panics: false,
        }
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    pub fn with_error(self, error: MonitorError) -> Self {
        self.push(Err(error))
    }

    /// Sleep this long inside every fetch before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Panic inside every fetch.
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    fn push(mut self, response: MonitorResult<String>) -> Self {
        self.script.get_mut().responses.push(response);
        self
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Instants at which each fetch started.
    pub async fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, _endpoint: &str, _timeout: Duration) -> MonitorResult<String> {
        self.calls.lock().await.push(Instant::now());
        if self.panics {
            panic!("mock fetcher panicked");
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script.lock().await.next().unwrap_or_else(|| Ok(String::new()))
    }

    fn fetcher_name(&self) -> &str {
        "mock"
    }
}

/// Analyzer returning scripted analyses or errors.
pub struct MockAnalyzer {
    script: Mutex<Script<MonitorResult<Analysis>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_analysis(self, analysis: Analysis) -> Self {
        self.push(Ok(analysis))
    }

    pub fn with_error(self, error: MonitorError) -> Self {
        self.push(Err(error))
    }

    fn push(mut self, response: MonitorResult<Analysis>) -> Self {
        self.script.get_mut().responses.push(response);
        self
    }

    /// `(text, condition)` pairs seen so far.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(&self, text: &str, condition: &str) -> MonitorResult<Analysis> {
        self.calls.lock().await.push((text.to_string(), condition.to_string()));
        self.script.lock().await.next().unwrap_or_else(|| {
            Ok(Analysis {
                availability: false,
                findings: Vec::new(),
                summary: "no scripted analysis".to_string(),
            })
        })
    }

    fn analyzer_name(&self) -> &str {
        "mock"
    }
}

/// Notifier recording every message; delivers to everyone unless scripted otherwise.
pub struct MockNotifier {
    script: Mutex<Script<MonitorResult<DeliveryReport>>>,
    sent: Mutex<Vec<(Vec<String>, String)>>,
    panics: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::new()),
            sent: Mutex::new(Vec::new()),
            panics: false,
        }
    }

    /// Panic inside every send, after recording it.
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn with_error(mut self, error: MonitorError) -> Self {
        self.script.get_mut().responses.push(Err(error));
        self
    }

    pub fn with_report(mut self, report: DeliveryReport) -> Self {
        self.script.get_mut().responses.push(Ok(report));
        self
    }

    /// Every `(recipients, message)` send attempt, in order.
    pub async fn sent(&self) -> Vec<(Vec<String>, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, recipients: &[String], message: &str) -> MonitorResult<DeliveryReport> {
        self.sent.lock().await.push((recipients.to_vec(), message.to_string()));
        if self.panics {
            panic!("mock notifier panicked");
        }
        self.script.lock().await.next().unwrap_or_else(|| {
            Ok(DeliveryReport {
                delivered: recipients.to_vec(),
                failed: Vec::new(),
            })
        })
    }

    fn notifier_name(&self) -> &str {
        "mock"
    }
}

/// Fetcher dispatching to a different [`MockFetcher`] per endpoint.
///
/// Unrouted endpoints fail with a permanent fetch error.
#[derive(Default)]
pub struct RoutedFetcher {
    routes: HashMap<String, Arc<MockFetcher>>,
}

impl RoutedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, endpoint: impl Into<String>, fetcher: Arc<MockFetcher>) -> Self {
        self.routes.insert(endpoint.into(), fetcher);
        self
    }
}

#[async_trait]
impl Fetcher for RoutedFetcher {
    async fn fetch(&self, endpoint: &str, timeout: Duration) -> MonitorResult<String> {
        match self.routes.get(endpoint) {
            Some(fetcher) => fetcher.fetch(endpoint, timeout).await,
            None => Err(MonitorError::permanent_fetch(format!("no route for {}", endpoint))),
        }
    }

    fn fetcher_name(&self) -> &str {
        "routed-mock"
    }
}
