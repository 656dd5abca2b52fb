//! Calendar-day aggregation of sessions and scores.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Days, Local, TimeZone, Utc};

use crate::models::{DailySummary, DailyTrendPoint, RangeStats, ScoreEntry, SessionEntry};
use crate::storage::TrendConfig;
use crate::time::{calendar_day, end_of_day_window, is_midnight_in, parse_instant_in, DAY_FORMAT};

/// Number of points in the default trend chart.
pub const DEFAULT_TREND_DAYS: usize = 7;

/// Groups time-stamped records into calendar days of one time zone.
///
/// The application uses [`TemporalAggregator::local`]. Tests and hosts that
/// pin a zone use [`TemporalAggregator::with_timezone`].
#[derive(Debug, Clone)]
pub struct TemporalAggregator<Tz: TimeZone = Local> {
    tz: Tz,
}

impl TemporalAggregator<Local> {
    pub fn local() -> Self {
        Self { tz: Local }
    }
}

impl Default for TemporalAggregator<Local> {
    fn default() -> Self {
        Self::local()
    }
}

impl<Tz: TimeZone> TemporalAggregator<Tz> {
    pub fn with_timezone(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    fn parse(&self, value: &str) -> Option<DateTime<Utc>> {
        parse_instant_in(value, &self.tz)
    }

    /// `YYYY-MM-DD` of the calendar day containing `instant`.
    pub fn format_instant(&self, instant: &DateTime<Utc>) -> String {
        calendar_day(instant, &self.tz).format(DAY_FORMAT).to_string()
    }

    /// `YYYY-MM-DD` of a stored timestamp, or an empty string if it does not parse.
    pub fn format_date(&self, value: &str) -> String {
        match self.parse(value) {
            Some(instant) => self.format_instant(&instant),
            None => {
                tracing::error!(value, "invalid date value");
                String::new()
            }
        }
    }

    /// Day key for bucketing, or `None` if the value does not parse.
    fn bucket(&self, value: &str) -> Option<String> {
        match self.parse(value) {
            Some(instant) => Some(self.format_instant(&instant)),
            None => {
                tracing::debug!(value, "skipping entry with unparseable date");
                None
            }
        }
    }

    /// Per-day totals, newest day first.
    ///
    /// Sessions are bucketed by `ended_at`, scores by `created_at`. A score
    /// whose day has no session contribution at the time it is scanned adds
    /// its own `seconds`, which covers days imported without their sessions.
    pub fn create_daily_summaries(
        &self,
        sessions: &[SessionEntry],
        scores: &[ScoreEntry],
    ) -> Vec<DailySummary> {
        let mut days: BTreeMap<String, DailySummary> = BTreeMap::new();

        for session in sessions {
            let Some(date) = self.bucket(&session.ended_at) else {
                continue;
            };
            let day = days
                .entry(date.clone())
                .or_insert_with(|| DailySummary::empty(date));
            day.total_seconds += session.seconds;
            day.session_count += 1;
        }

        for score in scores {
            let Some(date) = self.bucket(&score.created_at) else {
                continue;
            };
            let day = days
                .entry(date.clone())
                .or_insert_with(|| DailySummary::empty(date));
            day.total_points += u64::from(score.points);
            day.score_count += 1;
            if day.session_count == 0 {
                if let Some(seconds) = score.seconds {
                    day.total_seconds += seconds;
                }
            }
        }

        // YYYY-MM-DD sorts chronologically.
        days.into_values().rev().collect()
    }

    /// `count` consecutive days ending on `end_date`'s day, oldest first.
    pub fn build_weekly_trend(
        &self,
        summaries: &[DailySummary],
        count: usize,
        end_date: DateTime<Utc>,
    ) -> Vec<DailyTrendPoint> {
        let mut by_date: HashMap<&str, &DailySummary> = HashMap::with_capacity(summaries.len());
        for summary in summaries {
            by_date.entry(summary.date.as_str()).or_insert(summary);
        }

        let end_day = calendar_day(&end_date, &self.tz);
        (0..count as u64)
            .rev()
            .filter_map(|offset| end_day.checked_sub_days(Days::new(offset)))
            .map(|day| {
                let date = day.format(DAY_FORMAT).to_string();
                let minutes = by_date
                    .get(date.as_str())
                    .map(|s| (s.total_seconds as f64 / 60.0).round() as u64)
                    .unwrap_or(0);
                DailyTrendPoint { date, minutes }
            })
            .collect()
    }

    /// Seven-day trend ending today.
    pub fn build_weekly_trend_default(&self, summaries: &[DailySummary]) -> Vec<DailyTrendPoint> {
        self.build_weekly_trend(summaries, DEFAULT_TREND_DAYS, Utc::now())
    }

    /// Trend ending today with the configured number of days.
    pub fn build_trend_with_config(
        &self,
        summaries: &[DailySummary],
        config: &TrendConfig,
    ) -> Vec<DailyTrendPoint> {
        self.build_weekly_trend(summaries, config.days, Utc::now())
    }

    /// Inclusive upper bound used by [`Self::get_stats_for_date_range`].
    ///
    /// An empty or inverted range covers the whole day starting at `start`.
    /// An `end` exactly at local or UTC midnight names a day, so the window
    /// extends through that day.
    pub fn adjusted_range_end(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DateTime<Utc> {
        if end <= start {
            end_of_day_window(start)
        } else if is_midnight_in(&end, &self.tz) || is_midnight_in(&end, &Utc) {
            end_of_day_window(end)
        } else {
            end
        }
    }

    /// Totals for sessions that ended inside `[start, adjusted end]`.
    pub fn get_stats_for_date_range(
        &self,
        sessions: &[SessionEntry],
        scores: &[ScoreEntry],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RangeStats {
        let adjusted_end = self.adjusted_range_end(start, end);
        let points_by_session: HashMap<&str, u32> = scores
            .iter()
            .map(|score| (score.session_id.as_str(), score.points))
            .collect();

        let mut stats = RangeStats::default();
        for session in sessions {
            let Some(ended_at) = self.parse(&session.ended_at) else {
                continue;
            };
            if ended_at < start || ended_at > adjusted_end {
                continue;
            }
            stats.total_minutes += session.seconds.div_ceil(60);
            stats.total_points += points_by_session
                .get(session.id.as_str())
                .copied()
                .map(u64::from)
                .unwrap_or(0);
            stats.session_count += 1;
        }
        stats
    }
}
