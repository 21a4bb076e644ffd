//! Target registry.
//!
//! Validates raw target definitions into [`Target`] values. Validation is
//! per target: a rejected entry is reported as a [`MonitorError::Config`]
//! and the remaining entries still load.

use std::collections::HashSet;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

use crate::monitor::{
    error::MonitorError,
    types::{Target, TimeWindow},
};

/// Interval used when a raw target does not set one (5 minutes).
pub const DEFAULT_INTERVAL_SECONDS: i64 = 300;

/// Timezone used when a window is configured without one.
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// A target definition as it appears in the targets file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTarget {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(alias = "user_instructions")]
    pub condition: Option<String>,
    #[serde(alias = "check_interval_seconds")]
    pub interval: Option<i64>,
    pub enabled: Option<bool>,
    pub check_start_hour: Option<i64>,
    pub check_end_hour: Option<i64>,
    pub check_timezone: Option<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
    pub notification_message: Option<String>,
}

/// Outcome of loading a batch of raw targets.
#[derive(Debug, Default)]
pub struct RegistryLoad {
    pub targets: Vec<Target>,
    pub errors: Vec<MonitorError>,
}

impl RegistryLoad {
    pub fn enabled(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter().filter(|t| t.enabled)
    }
}

/// Validate every raw target. The first occurrence of an id wins; later
/// duplicates are rejected.
pub fn load(raw_targets: Vec<RawTarget>) -> RegistryLoad {
    load_entries(raw_targets.into_iter().map(Ok))
}

/// Like [`load`], but deserializes each JSON entry on its own so that a
/// wrongly typed field only rejects the entry it appears in.
pub fn load_json(entries: Vec<Value>) -> RegistryLoad {
    load_entries(entries.into_iter().enumerate().map(|(index, entry)| {
        let label = entry
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", index));
        serde_json::from_value::<RawTarget>(entry)
            .map_err(|e| MonitorError::config(label, format!("invalid target definition: {}", e)))
    }))
}

fn load_entries<I>(entries: I) -> RegistryLoad
where
    I: IntoIterator<Item = Result<RawTarget, MonitorError>>,
{
    let mut seen = HashSet::new();
    let mut load = RegistryLoad::default();

    for (index, entry) in entries.into_iter().enumerate() {
        match entry.and_then(|raw| validate(raw, index)) {
            Ok(target) => {
                if !seen.insert(target.id.clone()) {
                    tracing::warn!(target_id = %target.id, "Duplicate target id rejected");
                    load.errors.push(MonitorError::config(&target.id, "duplicate target id"));
                    continue;
                }
                tracing::info!(target_id = %target.id, enabled = target.enabled, "Loaded target");
                load.targets.push(target);
            }
            Err(err) => {
                tracing::error!("Failed to load target: {}", err);
                load.errors.push(err);
            }
        }
    }

    tracing::info!(
        "Targets loaded: {} valid, {} rejected",
        load.targets.len(),
        load.errors.len()
    );
    load
}

fn validate(raw: RawTarget, index: usize) -> Result<Target, MonitorError> {
    let id = non_blank(raw.id)
        .ok_or_else(|| MonitorError::config(format!("#{}", index), "missing required field 'id'"))?;
    let enabled = raw.enabled.unwrap_or(true);

    let endpoint = non_blank(raw.url);
    let condition = non_blank(raw.condition);
    if enabled {
        if endpoint.is_none() {
            return Err(MonitorError::config(&id, "missing required field 'url'"));
        }
        if condition.is_none() {
            return Err(MonitorError::config(&id, "missing required field 'condition'"));
        }
    }

    let interval_seconds = raw.interval.unwrap_or(DEFAULT_INTERVAL_SECONDS);
    if interval_seconds <= 0 {
        return Err(MonitorError::config(
            &id,
            format!("interval must be positive, got {}", interval_seconds),
        ));
    }

    let window = parse_window(
        &id,
        raw.check_start_hour,
        raw.check_end_hour,
        raw.check_timezone.as_deref(),
    )?;

    Ok(Target {
        name: non_blank(raw.name).unwrap_or_else(|| id.clone()),
        endpoint: endpoint.unwrap_or_default(),
        condition: condition.unwrap_or_default(),
        interval: Duration::from_secs(interval_seconds as u64),
        enabled,
        window,
        recipients: raw.recipients,
        notification_template: non_blank(raw.notification_message),
        id,
    })
}

fn parse_window(
    id: &str,
    start: Option<i64>,
    end: Option<i64>,
    timezone: Option<&str>,
) -> Result<Option<TimeWindow>, MonitorError> {
    let (start, end) = match (start, end) {
        (None, None) => return Ok(None),
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(MonitorError::config(
                id,
                "check_start_hour and check_end_hour must be set together",
            ))
        }
    };

    if !(0..=23).contains(&start) {
        return Err(MonitorError::config(id, format!("check_start_hour {} out of range 0-23", start)));
    }
    if !(0..=24).contains(&end) {
        return Err(MonitorError::config(id, format!("check_end_hour {} out of range 0-24", end)));
    }
    if start == end {
        return Err(MonitorError::config(id, "check window is empty (start == end)"));
    }

    let tz_name = timezone.unwrap_or(DEFAULT_TIMEZONE);
    let timezone: Tz = tz_name
        .parse()
        .map_err(|e| MonitorError::config(id, format!("unknown timezone '{}': {}", tz_name, e)))?;

    Ok(Some(TimeWindow {
        start_hour: start as u32,
        end_hour: end as u32,
        timezone,
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str) -> RawTarget {
        RawTarget {
            id: Some(id.to_string()),
            name: Some(format!("Course {}", id)),
            url: Some(format!("https://example.edu/{}", id)),
            condition: Some("any section has open seats".to_string()),
            ..RawTarget::default()
        }
    }

    #[test]
    fn valid_target_uses_defaults() {
        let load = load(vec![raw("cmsc131")]);
        assert!(load.errors.is_empty());
        let target = &load.targets[0];
        assert_eq!(target.interval, Duration::from_secs(300));
        assert!(target.enabled);
        assert!(target.window.is_none());
    }

    #[test]
    fn duplicate_id_rejects_only_the_later_entry() {
        let mut second = raw("cmsc131");
        second.name = Some("Duplicate".to_string());
        let load = load(vec![raw("cmsc131"), second, raw("math140")]);

        assert_eq!(load.targets.len(), 2);
        assert_eq!(load.targets[0].name, "Course cmsc131");
        assert_eq!(load.errors.len(), 1);
        assert!(matches!(&load.errors[0], MonitorError::Config { target_id, .. } if target_id == "cmsc131"));
    }

    #[test]
    fn bad_target_does_not_block_others() {
        let mut missing_url = raw("bad");
        missing_url.url = None;
        let mut zero_interval = raw("zero");
        zero_interval.interval = Some(0);
        let mut negative_interval = raw("negative");
        negative_interval.interval = Some(-5);

        let load = load(vec![missing_url, raw("good"), zero_interval, negative_interval]);

        assert_eq!(load.targets.len(), 1);
        assert_eq!(load.targets[0].id, "good");
        assert_eq!(load.errors.len(), 3);
    }

    #[test]
    fn enabled_target_requires_condition() {
        let mut target = raw("cmsc131");
        target.condition = Some("   ".to_string());
        let load = load(vec![target]);
        assert!(load.targets.is_empty());
        assert_eq!(load.errors.len(), 1);
    }

    #[test]
    fn disabled_target_may_omit_endpoint_and_condition() {
        let target = RawTarget {
            id: Some("paused".to_string()),
            enabled: Some(false),
            ..RawTarget::default()
        };
        let load = load(vec![target]);
        assert_eq!(load.targets.len(), 1);
        assert_eq!(load.enabled().count(), 0);
        assert_eq!(load.targets[0].name, "paused");
    }

    #[test]
    fn missing_id_is_reported_by_position() {
        let mut target = raw("x");
        target.id = None;
        let load = load(vec![raw("a"), target]);
        assert!(matches!(&load.errors[0], MonitorError::Config { target_id, .. } if target_id == "#1"));
    }

    #[test]
    fn window_is_parsed_with_default_timezone() {
        let mut target = raw("cmsc131");
        target.check_start_hour = Some(8);
        target.check_end_hour = Some(23);
        let load = load(vec![target]);
        let window = load.targets[0].window.unwrap();
        assert_eq!(window.start_hour, 8);
        assert_eq!(window.end_hour, 23);
        assert_eq!(window.timezone, chrono_tz::America::New_York);
    }

    #[test]
    fn invalid_windows_are_rejected() {
        let mut half = raw("half");
        half.check_start_hour = Some(8);
        let mut empty = raw("empty");
        empty.check_start_hour = Some(8);
        empty.check_end_hour = Some(8);
        let mut out_of_range = raw("range");
        out_of_range.check_start_hour = Some(25);
        out_of_range.check_end_hour = Some(3);
        let mut bad_tz = raw("tz");
        bad_tz.check_start_hour = Some(8);
        bad_tz.check_end_hour = Some(23);
        bad_tz.check_timezone = Some("Mars/Olympus".to_string());

        let load = load(vec![half, empty, out_of_range, bad_tz]);
        assert!(load.targets.is_empty());
        assert_eq!(load.errors.len(), 4);
    }

    #[test]
    fn raw_target_accepts_legacy_field_names() {
        let json = r#"{
            "id": "cmsc131",
            "name": "CMSC131",
            "url": "https://app.testudo.umd.edu/soc/search?courseId=CMSC131",
            "user_instructions": "Notify me when any section has open seats",
            "check_interval_seconds": 120,
            "recipients": ["12345"]
        }"#;
        let raw: RawTarget = serde_json::from_str(json).unwrap();
        let load = load(vec![raw]);
        let target = &load.targets[0];
        assert_eq!(target.interval, Duration::from_secs(120));
        assert_eq!(target.condition, "Notify me when any section has open seats");
        assert_eq!(target.recipients, vec!["12345".to_string()]);
    }

    #[test]
    fn wrongly_typed_entry_only_rejects_itself() {
        let entries: Vec<Value> = serde_json::from_str(
            r#"[
                {"id": "cmsc131", "url": "https://example.edu/131", "condition": "open"},
                {"id": "cmsc132", "url": "https://example.edu/132", "condition": "open", "recipients": [12345]},
                {"url": "https://example.edu/216", "condition": "open", "interval": "300"}
            ]"#,
        )
        .unwrap();

        let load = load_json(entries);

        assert_eq!(load.targets.len(), 1);
        assert_eq!(load.targets[0].id, "cmsc131");
        assert_eq!(load.errors.len(), 2);
        assert!(matches!(&load.errors[0], MonitorError::Config { target_id, .. } if target_id == "cmsc132"));
        assert!(matches!(&load.errors[1], MonitorError::Config { target_id, .. } if target_id == "#2"));
    }
}
