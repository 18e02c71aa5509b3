//! Consumption velocity and time-to-limit forecast.
//!
//! A deliberately cheap two-point linear extrapolation, not a regression: the
//! window prefers points from the last hour so the forecast tracks the recent
//! trend, falling back to the last 10 points overall.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::history::HistoryEntry;

/// Usage limit the forecast extrapolates toward, in percentage units.
const LIMIT: f64 = 100.0;

/// Rate of change and estimated time until the limit is reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    /// Most recent recorded value
    pub current: f64,
    /// Value units per hour, rounded to two decimals; may be negative
    pub velocity_per_hour: f64,
    /// Minutes until the limit at constant velocity; 0 when already at or
    /// over the limit, -1 when usage is flat or decreasing (no forecast)
    pub minutes_to_limit: i64,
}

/// Estimate from a service's full history. `None` means insufficient data.
pub fn estimate(entries: &[HistoryEntry]) -> Option<Forecast> {
    estimate_at(entries, Utc::now())
}

pub fn estimate_at(entries: &[HistoryEntry], now: DateTime<Utc>) -> Option<Forecast> {
    if entries.len() < 2 {
        return None;
    }

    let cutoff = now - Duration::hours(1);
    let recent: Vec<&HistoryEntry> = entries.iter().filter(|e| e.timestamp > cutoff).collect();
    let window: Vec<&HistoryEntry> = if recent.len() >= 2 {
        recent
    } else {
        entries
            .iter()
            .skip(entries.len().saturating_sub(10))
            .collect()
    };
    if window.len() < 2 {
        return None;
    }

    let first = window[0];
    let last = window[window.len() - 1];

    let dt_hours = last
        .timestamp
        .signed_duration_since(first.timestamp)
        .num_seconds() as f64
        / 3600.0;
    if dt_hours <= 0.0 {
        return None;
    }

    let velocity = (last.value - first.value) / dt_hours;
    let current = last.value;

    let minutes_to_limit = if velocity <= 0.0 {
        -1
    } else if current >= LIMIT {
        0
    } else {
        ((LIMIT - current) / velocity * 60.0) as i64
    };

    Some(Forecast {
        current,
        velocity_per_hour: (velocity * 100.0).round() / 100.0,
        minutes_to_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::types::Details;
    use pretty_assertions::assert_eq;

    fn entry(at: DateTime<Utc>, value: f64) -> HistoryEntry {
        HistoryEntry {
            timestamp: at,
            value,
            extra: Details::new(),
        }
    }

    #[test]
    fn test_two_points_one_hour_apart() {
        let now = Utc::now();
        let entries = vec![entry(now - Duration::hours(1), 10.0), entry(now, 30.0)];

        let forecast = estimate_at(&entries, now).expect("forecast");
        assert_eq!(forecast.current, 30.0);
        assert_eq!(forecast.velocity_per_hour, 20.0);
        // floor((100 - 30) / 20 * 60) = 210
        assert_eq!(forecast.minutes_to_limit, 210);
    }

    #[test]
    fn test_single_point_is_insufficient() {
        let now = Utc::now();
        let entries = vec![entry(now, 50.0)];
        assert!(estimate_at(&entries, now).is_none());
    }

    #[test]
    fn test_duplicate_timestamps_are_insufficient() {
        let now = Utc::now();
        let at = now - Duration::minutes(5);
        let entries = vec![entry(at, 10.0), entry(at, 20.0)];
        assert!(estimate_at(&entries, now).is_none());
    }

    #[test]
    fn test_flat_or_decreasing_has_no_eta() {
        let now = Utc::now();
        let entries = vec![entry(now - Duration::minutes(30), 40.0), entry(now, 35.0)];

        let forecast = estimate_at(&entries, now).unwrap();
        assert!(forecast.velocity_per_hour < 0.0);
        assert_eq!(forecast.minutes_to_limit, -1);
    }

    #[test]
    fn test_at_limit_is_zero_minutes() {
        let now = Utc::now();
        let entries = vec![entry(now - Duration::minutes(30), 90.0), entry(now, 100.0)];

        let forecast = estimate_at(&entries, now).unwrap();
        assert!(forecast.velocity_per_hour > 0.0);
        assert_eq!(forecast.minutes_to_limit, 0);
    }

    #[test]
    fn test_falls_back_to_last_ten_points() {
        let now = Utc::now();
        // All points older than an hour, so the 1-hour window is empty.
        let mut entries = Vec::new();
        for i in 0..12 {
            let at = now - Duration::hours(24) + Duration::minutes(i * 10);
            entries.push(entry(at, i as f64));
        }

        let forecast = estimate_at(&entries, now).expect("fallback window");
        // Last 10 points: values 2..=11 over 90 minutes = 6/hour
        assert_eq!(forecast.current, 11.0);
        assert_eq!(forecast.velocity_per_hour, 6.0);
    }

    #[test]
    fn test_prefers_one_hour_window() {
        let now = Utc::now();
        let entries = vec![
            // Old steep climb that must not influence the estimate
            entry(now - Duration::hours(5), 0.0),
            entry(now - Duration::hours(4), 50.0),
            // Recent gentle climb
            entry(now - Duration::minutes(40), 60.0),
            entry(now - Duration::minutes(10), 61.0),
        ];

        let forecast = estimate_at(&entries, now).unwrap();
        assert_eq!(forecast.current, 61.0);
        assert_eq!(forecast.velocity_per_hour, 2.0);
    }

    #[test]
    fn test_velocity_rounded_to_two_decimals() {
        let now = Utc::now();
        let entries = vec![entry(now - Duration::minutes(45), 10.0), entry(now, 11.0)];

        let forecast = estimate_at(&entries, now).unwrap();
        // 1 / 0.75h = 1.3333... -> 1.33
        assert_eq!(forecast.velocity_per_hour, 1.33);
    }
}
