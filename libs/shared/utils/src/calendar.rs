use anyhow::{anyhow, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

/// Length of the rolling reservation horizon, in days.
pub const HORIZON_DAYS: i64 = 14;

/// Length of one reservation week within the horizon.
pub const WEEK_DAYS: i64 = 7;

/// Weekdays a doctor can hold a standing availability window on.
pub const WORKING_DAYS: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// English weekday name for a calendar date ("Monday" .. "Sunday").
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Signed day offset of `date` relative to `today`.
pub fn day_offset(today: NaiveDate, date: NaiveDate) -> i64 {
    (date - today).num_days()
}

/// Which reservation week an in-horizon offset falls into: 1 for days
/// 0-6, 2 for days 7-13. Offsets outside the horizon have no week.
pub fn week_of_offset(offset: i64) -> Option<u8> {
    match offset {
        0..=6 => Some(1),
        7..=13 => Some(2),
        _ => None,
    }
}

/// The `HORIZON_DAYS` consecutive dates starting at `start`.
pub fn horizon_dates(start: NaiveDate) -> Vec<NaiveDate> {
    (0..HORIZON_DAYS).map(|i| start + Duration::days(i)).collect()
}

/// Parse a 24-hour `HH:MM` time-of-day string.
pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| anyhow!("Invalid time format: {}", value))
}

pub fn format_24h(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub fn format_12h(time: NaiveTime) -> String {
    time.format("%I:%M %p").to_string()
}
