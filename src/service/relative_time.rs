//! Compact "time ago" labels for the dashboard table

use chrono::{DateTime, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// Label for the distance between `then` and `now`
///
/// The absolute difference is used, so future timestamps read the
/// same as past ones.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().abs();

    match seconds {
        s if s < 30 => "just now".to_string(),
        s if s < MINUTE => "30s ago".to_string(),
        s if s < HOUR => format!("{}m ago", s / MINUTE),
        s if s < DAY => format!("{}h ago", s / HOUR),
        s if s < WEEK => format!("{}d ago", s / DAY),
        s if s < MONTH => format!("{}w ago", s / WEEK),
        s if s < YEAR => format!("{}mo ago", s / MONTH),
        s => format!("{}y ago", s / YEAR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ago(seconds: i64) -> String {
        let now = Utc::now();
        relative_time(now - Duration::seconds(seconds), now)
    }

    #[test]
    fn buckets() {
        assert_eq!(ago(0), "just now");
        assert_eq!(ago(29), "just now");
        assert_eq!(ago(30), "30s ago");
        assert_eq!(ago(59), "30s ago");
        assert_eq!(ago(60), "1m ago");
        assert_eq!(ago(59 * MINUTE), "59m ago");
        assert_eq!(ago(HOUR), "1h ago");
        assert_eq!(ago(23 * HOUR), "23h ago");
        assert_eq!(ago(DAY), "1d ago");
        assert_eq!(ago(6 * DAY), "6d ago");
        assert_eq!(ago(WEEK), "1w ago");
        assert_eq!(ago(29 * DAY), "4w ago");
        assert_eq!(ago(30 * DAY), "1mo ago");
        assert_eq!(ago(364 * DAY), "12mo ago");
        assert_eq!(ago(YEAR), "1y ago");
        assert_eq!(ago(3 * YEAR), "3y ago");
    }

    #[test]
    fn future_uses_absolute_difference() {
        let now = Utc::now();
        assert_eq!(relative_time(now + Duration::hours(2), now), "2h ago");
    }
}
