//! Timestamp conventions.
//!
//! Rows store UTC as RFC 3339 text with a fixed microsecond width, so lexical
//! order in SQL equals chronological order. Anything shown to a user goes
//! through [`display_time`], which renders in the fixed UTC+05:30 display zone.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, SecondsFormat, Utc};

/// Offset of the display zone, in seconds east of UTC.
pub const DISPLAY_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

const DISPLAY_PATTERN: &str = "%d/%m/%Y - %I:%M %p";

pub fn to_storage(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}

pub fn now_for_storage() -> String {
    to_storage(Utc::now())
}

pub fn parse_storage(stored: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(stored)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's datetime('now') form, no zone: treat as UTC.
            NaiveDateTime::parse_from_str(stored, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .ok()
}

fn display_zone() -> FixedOffset {
    FixedOffset::east_opt(DISPLAY_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Render a stored timestamp as e.g. `05/03/2024 - 02:07 pm`.
///
/// An unparseable value is passed through untouched rather than failing the
/// whole view.
pub fn display_time(stored: &str) -> String {
    match parse_storage(stored) {
        Some(ts) => ts
            .with_timezone(&display_zone())
            .format(DISPLAY_PATTERN)
            .to_string()
            .to_lowercase(),
        None => stored.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn converts_to_display_zone_with_lowercase_meridiem() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 8, 37, 0).unwrap();
        assert_eq!(display_time(&to_storage(ts)), "05/03/2024 - 02:07 pm");
    }

    #[test]
    fn rolls_over_midnight_into_next_day() {
        let ts = Utc.with_ymd_and_hms(2024, 12, 31, 18, 30, 0).unwrap();
        assert_eq!(display_time(&to_storage(ts)), "01/01/2025 - 12:00 am");
    }

    #[test]
    fn accepts_sqlite_default_format() {
        assert_eq!(display_time("2024-01-01 00:00:00"), "01/01/2024 - 05:30 am");
    }

    #[test]
    fn storage_text_sorts_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let late = early + chrono::Duration::microseconds(1);
        assert!(to_storage(early) < to_storage(late));
        assert_eq!(parse_storage(&to_storage(late)), Some(late));
    }

    #[test]
    fn garbage_passes_through() {
        assert_eq!(display_time("not a time"), "not a time");
    }
}
