//! Plain HTTP page fetcher.
//!
//! Downloads a page with `reqwest` and reduces it to the visible text of
//! its `<body>`, whitespace-collapsed, ready for the analyzer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{Html, Selector};

use crate::monitor::{
    error::{MonitorError, MonitorResult},
    provider::Fetcher,
};
use crate::services::is_transient_status;

const USER_AGENT: &str = concat!("seatwatch/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, endpoint: &str, timeout: Duration) -> MonitorResult<String> {
        let url = Url::parse(endpoint).map_err(|e| {
            MonitorError::permanent_fetch(format!("invalid URL '{}': {}", endpoint, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MonitorError::permanent_fetch(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            )));
        }

        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_builder() {
                    MonitorError::permanent_fetch(err.to_string())
                } else {
                    MonitorError::transient_fetch(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = format!("{} returned HTTP {}", endpoint, status);
            return Err(if is_transient_status(status) {
                MonitorError::transient_fetch(message)
            } else {
                MonitorError::permanent_fetch(message)
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| MonitorError::transient_fetch(format!("failed to read body: {}", err)))?;

        Ok(extract_text(&body))
    }

    fn fetcher_name(&self) -> &str {
        "http"
    }
}

/// Visible text of an HTML document, with runs of whitespace collapsed.
///
/// Text inside `<script>`, `<style>` and `<noscript>` is skipped. Input
/// without a `<body>` (plain text) is parsed as-is.
pub fn extract_text(document: &str) -> String {
    let html = Html::parse_document(document);
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| html.select(&selector).next())
        .unwrap_or_else(|| html.root_element());

    let mut raw = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let parent = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name().to_string()));
        if matches!(parent.as_deref(), Some("script" | "style" | "noscript")) {
            continue;
        }
        raw.push_str(text);
        raw.push(' ');
    }

    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
