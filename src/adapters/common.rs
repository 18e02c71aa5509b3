//! Calendar and formatting helpers shared by the adapters.

use chrono::{DateTime, Datelike, Utc};

/// Human-readable countdown to the next calendar-day quota reset.
///
/// The reset day is clamped into 1..=28 so it is valid in every month; a reset
/// date already in the past rolls to the next month (January of the next year
/// after December).
pub fn reset_countdown(day: u32, now: DateTime<Utc>) -> String {
    let clamped = day.clamp(1, 28);
    let mut reset = now.with_day(clamped).unwrap_or(now);
    if reset <= now {
        reset = if now.month() == 12 {
            reset
                .with_year(now.year() + 1)
                .and_then(|r| r.with_month(1))
                .unwrap_or(reset)
        } else {
            reset.with_month(now.month() + 1).unwrap_or(reset)
        };
    }
    let delta = reset - now;
    let days = delta.num_days();
    let hours = (delta.num_seconds() % 86_400) / 3_600;
    format!("{days}d {hours}h")
}

/// Minutes from `now` until an RFC 3339 reset timestamp, floored at zero.
/// Unparseable or absent input yields 0.
pub fn parse_reset_minutes(resets_at: Option<&str>, now: DateTime<Utc>) -> i64 {
    let Some(raw) = resets_at else {
        return 0;
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(reset) => (reset.with_timezone(&Utc) - now).num_minutes().max(0),
        Err(_) => 0,
    }
}

/// Compact duration for reset labels: "2d 3h", "3h 5m", "42m", or empty.
pub fn format_minutes(minutes: i64) -> String {
    if minutes <= 0 {
        String::new()
    } else if minutes >= 1440 {
        format!("{}d {}h", minutes / 1440, (minutes % 1440) / 60)
    } else if minutes >= 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

/// Integer with thousands separators, for plan labels like "20,000 credits/mo".
pub fn group_thousands(n: f64) -> String {
    let raw = format!("{}", n.round() as i64);
    let (sign, digits) = raw.strip_prefix('-').map_or(("", raw.as_str()), |d| ("-", d));
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped}")
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
