//! Time-window gate.
//!
//! A window is a daily `[start_hour, end_hour)` range in the target's own
//! timezone. When `start_hour > end_hour` the range wraps midnight, so
//! `22..6` is open from 22:00 through 05:59:59.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};

use crate::monitor::types::{Target, TimeWindow};

impl TimeWindow {
    /// Whether a local wall-clock hour falls inside the window.
    pub fn contains_hour(&self, hour: u32) -> bool {
        if self.start_hour <= self.end_hour {
            self.start_hour <= hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }

    pub fn allows(&self, now: DateTime<Utc>) -> bool {
        self.contains_hour(now.with_timezone(&self.timezone).hour())
    }

    /// The first instant at or after `now` at which the window is open.
    ///
    /// Walks forward one local hour at a time; local hours skipped by a DST
    /// transition are stepped over.
    pub fn next_opening(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.allows(now) {
            return Some(now);
        }

        let local = now.with_timezone(&self.timezone).naive_local();
        let mut candidate = local.date().and_hms_opt(local.hour(), 0, 0)?;
        for _ in 0..48 {
            candidate += Duration::hours(1);
            if !self.contains_hour(candidate.hour()) {
                continue;
            }
            if let Some(opening) = self.timezone.from_local_datetime(&candidate).earliest() {
                return Some(opening.with_timezone(&Utc));
            }
        }
        None
    }
}

/// Whether `target` may be checked at `now`. No window means always.
pub fn allowed(target: &Target, now: DateTime<Utc>) -> bool {
    target.window.map_or(true, |window| window.allows(now))
}

/// How long until `target`'s window opens; zero when it is already open.
pub fn until_open(target: &Target, now: DateTime<Utc>) -> std::time::Duration {
    let Some(window) = target.window else {
        return std::time::Duration::ZERO;
    };
    window
        .next_opening(now)
        .and_then(|opening| (opening - now).to_std().ok())
        .unwrap_or(std::time::Duration::ZERO)
}
