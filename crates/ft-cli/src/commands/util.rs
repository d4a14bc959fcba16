//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(second|minute|hour|day|week)s?\s+ago$").expect("valid regex")
});

/// Conservative bounds for relative time parsing (~1000 years in seconds).
const MAX_RELATIVE_SECONDS: i64 = 1000 * 365 * 24 * 60 * 60;

/// Parse a datetime string relative to `now`.
///
/// Supports:
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Relative: "90 seconds ago", "2 hours ago", "1 day ago", "1 week ago"
/// - "now"
pub fn parse_datetime_at(s: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("now") {
        return Ok(now);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z), 'now', or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let seconds_per_unit = match &caps[2] {
        "second" => 1,
        "minute" => 60,
        "hour" => 60 * 60,
        "day" => 60 * 60 * 24,
        "week" => 60 * 60 * 24 * 7,
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > MAX_RELATIVE_SECONDS / seconds_per_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now - Duration::seconds(n * seconds_per_unit))
}

/// Formats a duration for humans.
///
/// Returns "Xh Ym" if >= 1 hour, "Xm" if >= 1 minute, "Xs" otherwise.
/// Negative durations are shown as "0s".
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else if minutes >= 1 {
        format!("{minutes}m")
    } else {
        format!("{total_seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn parses_rfc3339() {
        let parsed = parse_datetime_at("2025-01-01T10:30:00+02:00", fixed_now()).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-01-01T08:30:00+00:00");
    }

    #[test]
    fn parses_relative_units() {
        let now = fixed_now();
        assert_eq!(
            parse_datetime_at("90 seconds ago", now).unwrap(),
            now - Duration::seconds(90)
        );
        assert_eq!(
            parse_datetime_at("1 minute ago", now).unwrap(),
            now - Duration::minutes(1)
        );
        assert_eq!(
            parse_datetime_at("2 hours ago", now).unwrap(),
            now - Duration::hours(2)
        );
        assert_eq!(
            parse_datetime_at("3 days ago", now).unwrap(),
            now - Duration::days(3)
        );
        assert_eq!(
            parse_datetime_at("1 week ago", now).unwrap(),
            now - Duration::weeks(1)
        );
    }

    #[test]
    fn parses_now() {
        assert_eq!(parse_datetime_at("now", fixed_now()).unwrap(), fixed_now());
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_datetime_at("last tuesday", fixed_now()).unwrap_err();
        assert!(err.to_string().starts_with("Invalid datetime: last tuesday"));
    }

    #[test]
    fn rejects_huge_relative_values() {
        assert!(parse_datetime_at("999999999 weeks ago", fixed_now()).is_err());
    }

    #[test]
    fn format_duration_picks_unit() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(59)), "59s");
        assert_eq!(format_duration(Duration::seconds(60)), "1m");
        assert_eq!(format_duration(Duration::seconds(45 * 60 + 30)), "45m");
        assert_eq!(format_duration(Duration::seconds(3600)), "1h 0m");
        assert_eq!(format_duration(Duration::seconds(2 * 3600 + 15 * 60)), "2h 15m");
        assert_eq!(format_duration(Duration::seconds(-5)), "0s");
    }
}
