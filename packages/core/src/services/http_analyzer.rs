//! HTTP classification endpoint adapter.
//!
//! Posts the page text and the target's condition to a classification
//! service and validates its loosely-typed JSON reply before anything
//! reaches the monitoring core.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::monitor::{
    error::{MonitorError, MonitorResult},
    provider::Analyzer,
    types::{Analysis, Finding},
};
use crate::services::is_transient_status;

/// Page text beyond this many characters is cut before analysis.
pub const MAX_ANALYSIS_CHARS: usize = 15_000;

#[derive(Clone)]
pub struct HttpAnalyzer {
    endpoint: String,
    http: Client,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    condition: &'a str,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default, alias = "available", alias = "is_available")]
    availability: Option<bool>,
    #[serde(default, alias = "sections")]
    findings: Vec<RawFinding>,
    #[serde(default, alias = "raw_text_summary")]
    summary: String,
}

#[derive(Debug, Deserialize)]
struct RawFinding {
    #[serde(alias = "section_id")]
    identifier: String,
    #[serde(alias = "open_seats")]
    open_count: u32,
    #[serde(default, alias = "total_seats")]
    total_count: u32,
    #[serde(default, alias = "waitlist")]
    waitlist_count: u32,
}

impl HttpAnalyzer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, text: &str, condition: &str) -> MonitorResult<Analysis> {
        let text = truncate_chars(text, MAX_ANALYSIS_CHARS);

        let response = self
            .http
            .post(&self.endpoint)
            .json(&AnalyzeRequest { text, condition })
            .send()
            .await
            .map_err(|err| MonitorError::transient_analyze(format!("analyzer unreachable: {}", err)))?;

        let status = response.status();
        if !status.is_success() {
            let message = format!("analyzer returned HTTP {}", status);
            return Err(if is_transient_status(status) {
                MonitorError::transient_analyze(message)
            } else {
                MonitorError::permanent_analyze(message)
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| MonitorError::transient_analyze(format!("analyzer reply is not JSON: {}", err)))?;

        validate_analysis(body)
    }

    fn analyzer_name(&self) -> &str {
        "http"
    }
}

/// Strictly validate an analyzer reply.
///
/// A missing availability flag is read as `false`. Anything structurally
/// wrong (wrong types, negative counts, blank identifiers) is a
/// [`MonitorError::TransientAnalyze`].
pub fn validate_analysis(value: Value) -> MonitorResult<Analysis> {
    if !value.is_object() {
        return Err(MonitorError::transient_analyze("analyzer reply is not a JSON object"));
    }

    let raw: RawAnalysis = serde_json::from_value(value)
        .map_err(|err| MonitorError::transient_analyze(format!("malformed analyzer reply: {}", err)))?;

    let mut findings = Vec::with_capacity(raw.findings.len());
    for finding in raw.findings {
        let identifier = finding.identifier.trim().to_string();
        if identifier.is_empty() {
            return Err(MonitorError::transient_analyze("finding with blank identifier"));
        }
        findings.push(Finding {
            identifier,
            open_count: finding.open_count,
            total_count: finding.total_count,
            waitlist_count: finding.waitlist_count,
        });
    }

    Ok(Analysis {
        availability: raw.availability.unwrap_or(false),
        findings,
        summary: raw.summary,
    })
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => {
            tracing::warn!(
                "Page text too long ({} bytes), truncating to {} characters",
                text.len(),
                max_chars
            );
            &text[..index]
        }
        None => text,
    }
}
