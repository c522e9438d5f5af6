//! Date and duration parsing for source files.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;

/// Date-only layouts accepted in source files, tried in order.
///
/// Slash-separated dates are read day first (`DD/MM/YYYY`).
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// Date-time layouts accepted in source files; the time component is dropped.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse a calendar date from any of the layouts seen in source files.
///
/// Returns `None` for empty or unrecognised text.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

fn hms_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+):(\d+):(\d+)$").expect("regex is valid"))
}

/// Convert an `HH:MM:SS` duration to total minutes.
///
/// Malformed text yields `0.0` rather than an error.
///
/// # Examples
///
/// ```
/// use perf_core::time_utils::hms_to_minutes;
///
/// assert_eq!(hms_to_minutes("05:30:00"), 330.0);
/// assert_eq!(hms_to_minutes("00:01:30"), 1.5);
/// assert_eq!(hms_to_minutes("bad"), 0.0);
/// ```
pub fn hms_to_minutes(hms: &str) -> f64 {
    let Some(caps) = hms_regex().captures(hms.trim()) else {
        return 0.0;
    };
    let field = |i: usize| caps[i].parse::<u64>().ok();
    match (field(1), field(2), field(3)) {
        (Some(h), Some(m), Some(s)) => h as f64 * 60.0 + m as f64 + s as f64 / 60.0,
        _ => 0.0,
    }
}

/// Season label for a date, with seasons starting on 1 July.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use perf_core::time_utils::season_for;
///
/// let d = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
/// assert_eq!(season_for(d), "2023-24");
/// ```
pub fn season_for(date: NaiveDate) -> String {
    let start = if date.month() >= 7 { date.year() } else { date.year() - 1 };
    format!("{}-{:02}", start, (start + 1).rem_euclid(100))
}

/// Format a minute count as `HH:MM:SS` (seconds rounded).
pub fn minutes_to_hms(minutes: f64) -> String {
    let total = (minutes.max(0.0) * 60.0).round() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_hms_to_minutes_basic() {
        assert_eq!(hms_to_minutes("05:30:00"), 330.0);
        assert_eq!(hms_to_minutes("00:00:30"), 0.5);
        assert_eq!(hms_to_minutes(" 01:00:00 "), 60.0);
    }

    #[test]
    fn test_hms_to_minutes_malformed_is_zero() {
        assert_eq!(hms_to_minutes("bad"), 0.0);
        assert_eq!(hms_to_minutes(""), 0.0);
        assert_eq!(hms_to_minutes("10:00"), 0.0);
        assert_eq!(hms_to_minutes("1:2:3:4"), 0.0);
        assert_eq!(hms_to_minutes("-1:00:00"), 0.0);
        assert_eq!(hms_to_minutes("aa:bb:cc"), 0.0);
    }

    #[test]
    fn test_hms_to_minutes_overflowing_field_is_zero() {
        assert_eq!(hms_to_minutes("99999999999999999999999:00:00"), 0.0);
    }

    #[test]
    fn test_minutes_to_hms() {
        assert_eq!(minutes_to_hms(330.0), "05:30:00");
        assert_eq!(minutes_to_hms(1.5), "00:01:30");
        assert_eq!(minutes_to_hms(-4.0), "00:00:00");
    }

    #[test]
    fn test_season_for_boundaries() {
        assert_eq!(season_for(date(2023, 7, 1)), "2023-24");
        assert_eq!(season_for(date(2024, 6, 30)), "2023-24");
        assert_eq!(season_for(date(2024, 7, 1)), "2024-25");
        assert_eq!(season_for(date(1999, 8, 1)), "1999-00");
    }

    #[test]
    fn test_parse_date_iso() {
        assert_eq!(parse_date("2024-03-15"), Some(date(2024, 3, 15)));
    }

    #[test]
    fn test_parse_date_day_first() {
        assert_eq!(parse_date("12/11/2024"), Some(date(2024, 11, 12)));
        assert_eq!(parse_date("18/06/2024"), Some(date(2024, 6, 18)));
    }

    #[test]
    fn test_parse_date_with_time_component() {
        assert_eq!(parse_date("2024-03-15 00:00:00"), Some(date(2024, 3, 15)));
        assert_eq!(parse_date("2024-03-15T08:30:00"), Some(date(2024, 3, 15)));
    }

    #[test]
    fn test_parse_date_invalid() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("31/02/2024"), None);
    }
}
