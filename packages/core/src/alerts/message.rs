//! Alert message rendering.
//!
//! A target may carry its own `notification_message` template; otherwise
//! [`DEFAULT_TEMPLATE`] is used. Templates may reference `{name}`,
//! `{sections}`, `{url}` and `{summary}`.

use crate::monitor::types::{CheckResult, Target};

pub const DEFAULT_TEMPLATE: &str = "ALERT: {name} has open seats!\nSections: {sections}\nLink: {url}";

/// Values substituted into an alert template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPayload {
    /// Display name of the target.
    pub name: String,
    /// Identifiers with a positive open count, comma separated.
    pub sections: String,
    pub url: String,
    /// Analyzer summary of the page.
    pub summary: String,
}

impl AlertPayload {
    pub fn new(target: &Target, result: &CheckResult) -> Self {
        Self {
            name: target.name.clone(),
            sections: result.open_identifiers().join(", "),
            url: target.endpoint.clone(),
            summary: result.summary.clone(),
        }
    }

    /// Substitute placeholders in one pass. Substituted values are never
    /// scanned again, and unknown placeholders are kept verbatim.
    pub fn render_with(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let field = tail
                .find('}')
                .and_then(|close| self.field(&tail[1..close]).map(|value| (close, value)));
            match field {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &tail[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "name" => Some(&self.name),
            "sections" => Some(&self.sections),
            "url" => Some(&self.url),
            "summary" => Some(&self.summary),
            _ => None,
        }
    }
}

/// The message to send for `result` on behalf of `target`.
pub fn render(target: &Target, result: &CheckResult) -> String {
    let template = target.notification_template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
    AlertPayload::new(target, result).render_with(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::monitor::types::{Analysis, Finding};

    fn target(template: Option<&str>) -> Target {
        Target {
            id: "cmsc131".to_string(),
            name: "CMSC131".to_string(),
            endpoint: "https://app.testudo.umd.edu/soc/search?courseId=CMSC131".to_string(),
            condition: "open seats".to_string(),
            interval: Duration::from_secs(300),
            enabled: true,
            window: None,
            recipients: vec!["42".to_string()],
            notification_template: template.map(str::to_string),
        }
    }

    fn result() -> CheckResult {
        let finding = |id: &str, open| Finding {
            identifier: id.to_string(),
            open_count: open,
            total_count: 30,
            waitlist_count: 0,
        };
        CheckResult::from_analysis(
            "cmsc131",
            Analysis {
                availability: true,
                findings: vec![finding("0101", 0), finding("0201", 2), finding("0202", 1)],
                summary: "two sections open".to_string(),
            },
        )
    }

    #[test]
    fn default_template_lists_open_sections() {
        assert_eq!(
            render(&target(None), &result()),
            "ALERT: CMSC131 has open seats!\nSections: 0201, 0202\nLink: https://app.testudo.umd.edu/soc/search?courseId=CMSC131"
        );
    }

    #[test]
    fn custom_template_substitutes_placeholders() {
        let message = render(&target(Some("{name}: {summary} ({sections})")), &result());
        assert_eq!(message, "CMSC131: two sections open (0201, 0202)");
    }

    #[test]
    fn placeholders_inside_values_are_not_expanded() {
        let mut result = result();
        result.summary = "see {url} and {name}".to_string();

        let message = render(&target(Some("{summary} | {name}")), &result);
        assert_eq!(message, "see {url} and {name} | CMSC131");
    }

    #[test]
    fn unknown_and_unclosed_braces_are_kept() {
        let message = render(&target(Some("{name} {seats} {")), &result());
        assert_eq!(message, "CMSC131 {seats} {");
    }
}
