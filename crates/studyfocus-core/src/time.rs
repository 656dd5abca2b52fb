//! Instant parsing and calendar-day helpers.
//!
//! Every timestamp read from the store goes through [`parse_instant_in`].
//! Accepted shapes:
//!
//! | Input | Interpretation |
//! |-------|----------------|
//! | RFC 3339 (`2026-02-17T09:30:00.000Z`, `...+09:00`) | the given instant |
//! | `YYYY-MM-DDTHH:MM[:SS[.fff]]` without offset | wall-clock time in the calendar zone |
//! | `YYYY-MM-DD` | UTC midnight of that date |
//!
//! Anything else is `None`. Callers skip such records.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

/// Date format used for calendar-day buckets.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse a stored timestamp, reading offset-less values as local time.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    parse_instant_in(value, &Local)
}

/// Parse a stored timestamp, reading offset-less values in `tz`.
pub fn parse_instant_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            // A wall-clock time skipped by a DST jump has no instant.
            return tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }

    NaiveDate::parse_from_str(value, DAY_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Calendar day of `instant` in `tz`.
pub fn calendar_day<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Whether `instant` sits exactly on a midnight in `tz`.
pub fn is_midnight_in<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> bool {
    let local = instant.with_timezone(tz);
    local.hour() == 0 && local.minute() == 0 && local.second() == 0 && local.nanosecond() == 0
}

/// `instant + 1 day - 1 ms`: the last millisecond of a day-long window.
pub fn end_of_day_window(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant + Duration::days(1) - Duration::milliseconds(1)
}
