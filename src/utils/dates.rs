use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};

use crate::models::ActivityEvent;

/// UTC calendar day of a unix timestamp.
pub fn day_of(timestamp_seconds: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp_seconds, 0).map(|dt| dt.date_naive())
}

/// "March 2024"
pub fn month_year(timestamp_seconds: i64) -> String {
    DateTime::from_timestamp(timestamp_seconds, 0)
        .map(|dt| dt.format("%B %Y").to_string())
        .unwrap_or_default()
}

/// "Mar 2024"
pub fn short_month_year(timestamp_seconds: i64) -> String {
    DateTime::from_timestamp(timestamp_seconds, 0)
        .map(|dt| dt.format("%b %Y").to_string())
        .unwrap_or_default()
}

/// Human-readable distance from `then` to `now`, e.g. "3 hours ago".
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);

    if elapsed < Duration::minutes(1) {
        return "just now".to_string();
    }

    let (amount, unit) = if elapsed < Duration::hours(1) {
        (elapsed.num_minutes(), "minute")
    } else if elapsed < Duration::days(1) {
        (elapsed.num_hours(), "hour")
    } else if elapsed < Duration::days(30) {
        (elapsed.num_days(), "day")
    } else if elapsed < Duration::days(365) {
        (elapsed.num_days() / 30, "month")
    } else {
        (elapsed.num_days() / 365, "year")
    };

    if amount == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", amount, unit)
    }
}

pub fn format_relative_seconds(timestamp_seconds: i64, now: DateTime<Utc>) -> Option<String> {
    DateTime::from_timestamp(timestamp_seconds, 0).map(|then| format_relative(then, now))
}

/// Per-day count of distinct problem keys. Repeated events for the same
/// problem on the same day count once. `window` bounds are inclusive.
pub fn daily_distinct_counts<'a, I>(
    events: I,
    window: Option<(NaiveDate, NaiveDate)>,
) -> BTreeMap<NaiveDate, usize>
where
    I: IntoIterator<Item = &'a ActivityEvent>,
{
    let mut buckets: BTreeMap<NaiveDate, HashSet<&'a str>> = BTreeMap::new();

    for event in events {
        let Some(day) = day_of(event.timestamp_seconds) else {
            continue;
        };
        if let Some((start, end)) = window {
            if day < start || day > end {
                continue;
            }
        }
        buckets
            .entry(day)
            .or_default()
            .insert(event.problem_key.as_str());
    }

    buckets
        .into_iter()
        .map(|(day, keys)| (day, keys.len()))
        .collect()
}

/// Longest run of consecutive calendar days with a non-zero count, looking
/// only at days inside the inclusive `window` when one is given.
pub fn longest_streak(
    counts: &BTreeMap<NaiveDate, usize>,
    window: Option<(NaiveDate, NaiveDate)>,
) -> u32 {
    let mut best = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;

    let active = counts.iter().filter(|(day, count)| {
        **count > 0
            && window
                .map(|(start, end)| **day >= start && **day <= end)
                .unwrap_or(true)
    });

    for (day, _) in active {
        current = match previous {
            Some(prev) if prev.succ_opt() == Some(*day) => current + 1,
            _ => 1,
        };
        best = best.max(current);
        previous = Some(*day);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(y: i32, m: u32, d: u32, h: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().timestamp()
    }

    fn event(timestamp_seconds: i64, key: &str) -> ActivityEvent {
        ActivityEvent {
            timestamp_seconds,
            problem_key: key.to_string(),
        }
    }

    #[test]
    fn test_relative_formatting() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(format_relative(now - Duration::seconds(20), now), "just now");
        assert_eq!(format_relative(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(format_relative(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(format_relative(now - Duration::days(3), now), "3 days ago");
        assert_eq!(format_relative(now - Duration::days(95), now), "3 months ago");
        assert_eq!(format_relative(now - Duration::days(800), now), "2 years ago");
    }

    #[test]
    fn test_month_labels() {
        assert_eq!(month_year(ts(2024, 3, 15, 0)), "March 2024");
        assert_eq!(short_month_year(ts(2024, 3, 15, 0)), "Mar 2024");
    }

    #[test]
    fn test_same_problem_same_day_counts_once() {
        let events = vec![
            event(ts(2024, 1, 5, 9), "1A"),
            event(ts(2024, 1, 5, 21), "1A"),
            event(ts(2024, 1, 5, 22), "1B"),
            event(ts(2024, 1, 6, 1), "1A"),
        ];

        let counts = daily_distinct_counts(&events, None);
        assert_eq!(counts.get(&date(2024, 1, 5)), Some(&2));
        assert_eq!(counts.get(&date(2024, 1, 6)), Some(&1));
    }

    #[test]
    fn test_window_excludes_outside_days() {
        let events = vec![event(ts(2023, 1, 1, 0), "1A"), event(ts(2024, 1, 1, 0), "1B")];
        let counts = daily_distinct_counts(&events, Some((date(2023, 6, 1), date(2024, 6, 1))));
        assert_eq!(counts.len(), 1);
    }

    #[test]
    fn test_longest_streak_breaks_on_gap() {
        let mut counts = BTreeMap::new();
        for d in [1, 2, 3, 5, 6, 7, 8, 10] {
            counts.insert(date(2024, 2, d), 1);
        }
        counts.insert(date(2024, 2, 9), 0);

        assert_eq!(longest_streak(&counts, None), 4);
        assert_eq!(longest_streak(&counts, Some((date(2024, 2, 7), date(2024, 2, 10)))), 2);
        assert_eq!(longest_streak(&BTreeMap::new(), None), 0);
    }

    #[test]
    fn test_streak_crosses_month_boundary() {
        let mut counts = BTreeMap::new();
        counts.insert(date(2024, 2, 28), 1);
        counts.insert(date(2024, 2, 29), 2);
        counts.insert(date(2024, 3, 1), 1);
        assert_eq!(longest_streak(&counts, None), 3);
    }
}
