//! Display formatting for table cells.

use chrono::{DateTime, Utc};

const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Human-readable byte count, 1024-based, three significant digits.
pub fn pretty_bytes(n: u64) -> String {
    if n < 1024 {
        return format!("{} B", n);
    }
    let exponent = (((n as f64).ln() / 1024f64.ln()).floor() as usize).min(UNITS.len() - 1);
    let value = n as f64 / 1024f64.powi(exponent as i32);
    format!("{} {}", three_significant(value), UNITS[exponent])
}

/// Byte rate, rendered like `pretty_bytes` with a `/s` suffix.
pub fn pretty_rate(n: u64) -> String {
    format!("{}/s", pretty_bytes(n))
}

/// Age of an RFC 3339 timestamp relative to now, compact (`42s`, `5m`, `3h`,
/// `2d`). Unparseable input is passed through untouched.
pub fn short_age(start: &str) -> String {
    match DateTime::parse_from_rfc3339(start) {
        Ok(t) => age_between(t.with_timezone(&Utc), Utc::now()),
        Err(_) => start.to_string(),
    }
}

fn age_between(start: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - start).num_seconds().max(0);
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m", secs / 60),
        3600..=86_399 => format!("{}h", secs / 3600),
        _ => format!("{}d", secs / 86_400),
    }
}

fn three_significant(value: f64) -> String {
    let text = if value >= 100.0 {
        format!("{:.0}", value)
    } else if value >= 10.0 {
        format!("{:.1}", value)
    } else {
        format!("{:.2}", value)
    };
    match text.contains('.') {
        true => text.trim_end_matches('0').trim_end_matches('.').to_string(),
        false => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn small_counts_stay_in_bytes() {
        assert_eq!(pretty_bytes(0), "0 B");
        assert_eq!(pretty_bytes(1023), "1023 B");
    }

    #[test]
    fn scales_with_three_significant_digits() {
        assert_eq!(pretty_bytes(1024), "1 KB");
        assert_eq!(pretty_bytes(1536), "1.5 KB");
        assert_eq!(pretty_bytes(1024 * 1024), "1 MB");
        assert_eq!(pretty_bytes(5_242_880), "5 MB");
        assert_eq!(pretty_bytes(123_456_789), "118 MB");
    }

    #[test]
    fn rate_appends_per_second() {
        assert_eq!(pretty_rate(2048), "2 KB/s");
    }

    #[test]
    fn age_buckets() {
        let now = Utc::now();
        assert_eq!(age_between(now - Duration::seconds(42), now), "42s");
        assert_eq!(age_between(now - Duration::minutes(5), now), "5m");
        assert_eq!(age_between(now - Duration::hours(3), now), "3h");
        assert_eq!(age_between(now - Duration::days(2), now), "2d");
        // Clock skew: a future start never goes negative.
        assert_eq!(age_between(now + Duration::seconds(5), now), "0s");
    }

    #[test]
    fn unparseable_start_passes_through() {
        assert_eq!(short_age("not-a-time"), "not-a-time");
    }
}
