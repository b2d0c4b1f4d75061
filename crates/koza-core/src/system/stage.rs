//! # Auto-Stage Progression
//!
//! Derives the current silkworm life-cycle stage from a declared start stage,
//! a start time and a per-stage duration table.
//!
//! ## Default Schedule
//!
//! | Stage | Days |
//! |-------|------|
//! | egg_incubation | 10 |
//! | adaptation_0_1 | 1 |
//! | larva_1 | 3 |
//! | larva_2 | 3 |
//! | larva_3 | 4 |
//! | larva_4 | 4 |
//! | larva_5 | 8 |
//! | cocoon | 6 |
//!
//! Progression is advisory: an unknown start stage or an unparseable start
//! time returns the start stage unchanged, and the last stage is terminal.

use crate::primitives::MS_PER_DAY;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default stage order, egg to cocoon.
pub const DEFAULT_STAGE_ORDER: [&str; 8] = [
    "egg_incubation",
    "adaptation_0_1",
    "larva_1",
    "larva_2",
    "larva_3",
    "larva_4",
    "larva_5",
    "cocoon",
];

/// Default stage durations in days, aligned with [`DEFAULT_STAGE_ORDER`].
pub const DEFAULT_STAGE_DAYS: [u32; 8] = [10, 1, 3, 3, 4, 4, 8, 6];

// =============================================================================
// STAGE SCHEDULE
// =============================================================================

/// Ordered stage list plus per-stage durations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSchedule {
    order: Vec<String>,
    durations: BTreeMap<String, u32>,
}

impl Default for StageSchedule {
    fn default() -> Self {
        Self {
            order: DEFAULT_STAGE_ORDER.iter().map(|s| (*s).to_string()).collect(),
            durations: DEFAULT_STAGE_ORDER
                .iter()
                .zip(DEFAULT_STAGE_DAYS)
                .map(|(s, d)| ((*s).to_string(), d))
                .collect(),
        }
    }
}

impl StageSchedule {
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn durations(&self) -> &BTreeMap<String, u32> {
        &self.durations
    }

    /// Duration of a stage in days, if scheduled.
    #[must_use]
    pub fn days_for(&self, stage: &str) -> Option<u32> {
        self.durations.get(stage).copied()
    }

    /// Full progress report for a start marker at `now_ms`.
    #[must_use]
    pub fn progress(&self, start_stage: &str, start_at_iso: &str, now_ms: i64) -> StageProgress {
        let elapsed_days = parse_start_ms(start_at_iso).map(|start| elapsed_days(start, now_ms));
        let (stage, day_in_stage) = match elapsed_days {
            Some(days) => walk(start_stage, days, &self.order, &self.durations),
            None => (start_stage.to_string(), 0),
        };
        let stage_days = self.days_for(&stage);

        StageProgress {
            stage,
            elapsed_days,
            day_in_stage,
            stage_days,
        }
    }
}

/// Where a batch stands in its schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    /// Current stage key.
    pub stage: String,
    /// Whole days since the start marker; `None` if it could not be parsed.
    pub elapsed_days: Option<u64>,
    /// Whole days spent in the current stage so far.
    pub day_in_stage: u64,
    /// Scheduled length of the current stage, if known.
    pub stage_days: Option<u32>,
}

// =============================================================================
// PROGRESSION
// =============================================================================

/// Compute the current stage from a start marker.
///
/// `elapsed = max(0, floor((now - start) / 1 day))`; walk forward from
/// `start_stage` consuming each stage's duration until the remainder is
/// shorter than the current stage, a zero-length stage is hit, or the last
/// stage is reached.
#[must_use]
pub fn compute_auto_stage<S: AsRef<str>>(
    start_stage: &str,
    start_at_iso: &str,
    now_ms: i64,
    stage_order: &[S],
    durations: &BTreeMap<String, u32>,
) -> String {
    let Some(start_ms) = parse_start_ms(start_at_iso) else {
        return start_stage.to_string();
    };
    walk(start_stage, elapsed_days(start_ms, now_ms), stage_order, durations).0
}

fn walk<S: AsRef<str>>(
    start_stage: &str,
    elapsed_days: u64,
    stage_order: &[S],
    durations: &BTreeMap<String, u32>,
) -> (String, u64) {
    let Some(mut idx) = stage_order.iter().position(|s| s.as_ref() == start_stage) else {
        return (start_stage.to_string(), elapsed_days);
    };

    let mut remaining = elapsed_days;
    while idx + 1 < stage_order.len() {
        let days = durations
            .get(stage_order[idx].as_ref())
            .copied()
            .unwrap_or(0) as u64;
        if days == 0 || remaining < days {
            break;
        }
        remaining -= days;
        idx += 1;
    }

    (stage_order[idx].as_ref().to_string(), remaining)
}

fn elapsed_days(start_ms: i64, now_ms: i64) -> u64 {
    let days = now_ms.saturating_sub(start_ms).div_euclid(MS_PER_DAY);
    days.max(0) as u64
}

/// Parse an ISO-8601 start marker into epoch milliseconds.
///
/// Accepts RFC 3339 (seconds optional), a naive date-time, or a bare date.
/// Values without an offset, or with a `Z` suffix, are read as UTC.
#[must_use]
pub fn parse_start_ms(iso: &str) -> Option<i64> {
    let iso = iso.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M%z"] {
        if let Ok(dt) = DateTime::parse_from_str(iso, fmt) {
            return Some(dt.timestamp_millis());
        }
    }

    let naive = iso.strip_suffix(['Z', 'z']).unwrap_or(iso);
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(iso, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "2026-03-01T00:00:00Z";

    fn now_after_days(days: i64) -> i64 {
        parse_start_ms(START).expect("start") + days * MS_PER_DAY
    }

    fn auto(start_stage: &str, days: i64) -> String {
        let schedule = StageSchedule::default();
        compute_auto_stage(
            start_stage,
            START,
            now_after_days(days),
            schedule.order(),
            schedule.durations(),
        )
    }

    #[test]
    fn stays_until_duration_is_reached() {
        assert_eq!(auto("larva_1", 2), "larva_1");
        assert_eq!(auto("larva_1", 3), "larva_2");
    }

    #[test]
    fn walks_across_several_stages() {
        // larva_1(3) + larva_2(3) + larva_3(4) = 10 days
        assert_eq!(auto("larva_1", 9), "larva_3");
        assert_eq!(auto("larva_1", 10), "larva_4");
        assert_eq!(auto("egg_incubation", 11), "larva_1");
    }

    #[test]
    fn last_stage_is_terminal() {
        assert_eq!(auto("larva_5", 500), "cocoon");
        assert_eq!(auto("cocoon", 500), "cocoon");
    }

    #[test]
    fn unknown_start_stage_is_returned_unchanged() {
        assert_eq!(auto("spinning", 40), "spinning");
    }

    #[test]
    fn unparseable_start_time_is_a_no_op() {
        let schedule = StageSchedule::default();
        let stage = compute_auto_stage(
            "larva_2",
            "not a date",
            now_after_days(30),
            schedule.order(),
            schedule.durations(),
        );
        assert_eq!(stage, "larva_2");
    }

    #[test]
    fn future_start_counts_as_zero_days() {
        assert_eq!(auto("larva_1", -5), "larva_1");
    }

    #[test]
    fn partial_days_are_floored() {
        let schedule = StageSchedule::default();
        let almost = now_after_days(3) - 1;
        let stage = compute_auto_stage(
            "larva_1",
            START,
            almost,
            schedule.order(),
            schedule.durations(),
        );
        assert_eq!(stage, "larva_1");
    }

    #[test]
    fn zero_length_stage_halts_progression() {
        let order = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut durations = BTreeMap::new();
        durations.insert("a".to_string(), 2);
        durations.insert("b".to_string(), 0);
        let stage = compute_auto_stage("a", START, now_after_days(50), &order, &durations);
        assert_eq!(stage, "b");

        let schedule = StageSchedule { order, durations };
        let progress = schedule.progress("a", START, now_after_days(50));
        assert_eq!(progress.stage, "b");
        assert_eq!(progress.day_in_stage, 48);
        assert_eq!(progress.stage_days, Some(0));
    }

    #[test]
    fn accepts_date_only_and_naive_timestamps() {
        assert_eq!(parse_start_ms("2026-03-01"), parse_start_ms(START));
        assert_eq!(parse_start_ms("2026-03-01T00:00:00"), parse_start_ms(START));
        assert!(parse_start_ms("").is_none());
    }

    #[test]
    fn accepts_minute_precision_with_offset() {
        let ten = parse_start_ms("2026-03-01T10:00:00Z");
        assert!(ten.is_some());
        assert_eq!(parse_start_ms("2026-03-01T10:00Z"), ten);
        assert_eq!(parse_start_ms("2026-03-01T13:00+03:00"), ten);
        assert_eq!(parse_start_ms("2026-03-01T13:00+0300"), ten);

        let schedule = StageSchedule::default();
        let stage = compute_auto_stage(
            "larva_1",
            "2026-03-01T00:00Z",
            now_after_days(3),
            schedule.order(),
            schedule.durations(),
        );
        assert_eq!(stage, "larva_2");
    }

    #[test]
    fn progress_reports_day_in_stage() {
        let schedule = StageSchedule::default();
        let progress = schedule.progress("larva_1", START, now_after_days(5));
        assert_eq!(progress.stage, "larva_2");
        assert_eq!(progress.elapsed_days, Some(5));
        assert_eq!(progress.day_in_stage, 2);
        assert_eq!(progress.stage_days, Some(3));

        let unknown = schedule.progress("larva_1", "garbage", now_after_days(5));
        assert_eq!(unknown.stage, "larva_1");
        assert_eq!(unknown.elapsed_days, None);
    }
}
