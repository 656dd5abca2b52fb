//! Statistics module for StudyFocus
//!
//! Daily summaries, trailing trend series and date-range totals over
//! sessions and scores. All functions are pure over the slices they are
//! given. The free functions bucket by the machine's local calendar day;
//! use [`TemporalAggregator::with_timezone`] to pin another zone.

mod aggregator;

pub use aggregator::{TemporalAggregator, DEFAULT_TREND_DAYS};

use chrono::{DateTime, Utc};

use crate::models::{DailySummary, DailyTrendPoint, RangeStats, ScoreEntry, SessionEntry};

/// Local `YYYY-MM-DD` of a stored timestamp, or `""` if it does not parse.
pub fn format_date(value: &str) -> String {
    TemporalAggregator::local().format_date(value)
}

/// Per-day totals in local calendar days, newest first.
pub fn create_daily_summaries(
    sessions: &[SessionEntry],
    scores: &[ScoreEntry],
) -> Vec<DailySummary> {
    TemporalAggregator::local().create_daily_summaries(sessions, scores)
}

/// `count` local days ending on `end_date`'s day, oldest first.
pub fn build_weekly_trend(
    summaries: &[DailySummary],
    count: usize,
    end_date: DateTime<Utc>,
) -> Vec<DailyTrendPoint> {
    TemporalAggregator::local().build_weekly_trend(summaries, count, end_date)
}

/// Seven local days ending today, oldest first.
pub fn build_weekly_trend_default(summaries: &[DailySummary]) -> Vec<DailyTrendPoint> {
    TemporalAggregator::local().build_weekly_trend_default(summaries)
}

/// Totals for sessions ending inside `[start, end]`, with day-boundary adjustment.
pub fn get_stats_for_date_range(
    sessions: &[SessionEntry],
    scores: &[ScoreEntry],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> RangeStats {
    TemporalAggregator::local().get_stats_for_date_range(sessions, scores, start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_format_of_wall_clock_value_keeps_its_date() {
        assert_eq!(format_date("2026-02-17T09:00:00"), "2026-02-17");
        assert_eq!(format_date("garbage"), "");
    }

    #[test]
    fn default_trend_matches_explicit_call() {
        let trend = build_weekly_trend_default(&[]);
        assert_eq!(trend.len(), DEFAULT_TREND_DAYS);
        assert!(trend.iter().all(|p| p.minutes == 0));
    }

    #[test]
    fn local_trend_ends_on_local_today() {
        let now = Utc::now();
        let trend = build_weekly_trend(&[], DEFAULT_TREND_DAYS, now);
        assert_eq!(trend.len(), 7);
        assert_eq!(
            trend[6].date,
            now.with_timezone(&chrono::Local).format("%Y-%m-%d").to_string()
        );
    }
}
