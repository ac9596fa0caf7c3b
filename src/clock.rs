//! Wall-clock parsing and time sources.
//!
//! Lineup times are 12-hour wall-clock strings such as `"8:00 PM"`. They are
//! converted to minutes since local midnight; an end time that is numerically
//! smaller than its start time means the performance runs past midnight.

use std::sync::Mutex;

use chrono::{Local, NaiveDateTime, NaiveTime};

use crate::error::ParseError;

/// Minutes in one calendar day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Noon, as minutes since midnight.
pub const NOON_MINUTE: u32 = 12 * 60;

/// Parse a `"h:mm AM/PM"` string into minutes since midnight.
///
/// `12:xx AM` maps to `0:xx` and `12:xx PM` to `12:xx`. The marker is
/// case-insensitive. 24-hour input is rejected.
pub fn parse_clock_time(text: &str) -> Result<u32, ParseError> {
    let mut tokens = text.split_whitespace();
    let (Some(time), Some(marker), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(ParseError::Shape(text.to_owned()));
    };

    let Some((hour, minute)) = time.split_once(':') else {
        return Err(ParseError::Shape(text.to_owned()));
    };
    if !is_digits(hour, 1..=2) || !is_digits(minute, 2..=2) {
        return Err(ParseError::Shape(text.to_owned()));
    }

    let hour: u32 = hour
        .parse()
        .map_err(|_| ParseError::Range(text.to_owned()))?;
    let minute: u32 = minute
        .parse()
        .map_err(|_| ParseError::Range(text.to_owned()))?;
    if !(1..=12).contains(&hour) || minute > 59 {
        return Err(ParseError::Range(text.to_owned()));
    }

    let pm = match marker.to_ascii_uppercase().as_str() {
        "AM" => false,
        "PM" => true,
        _ => {
            return Err(ParseError::Marker {
                text: text.to_owned(),
                marker: marker.to_owned(),
            });
        }
    };

    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    Ok(hour * 60 + minute)
}

fn is_digits(s: &str, len: std::ops::RangeInclusive<usize>) -> bool {
    len.contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

/// Length of a performance in minutes, wrapping across midnight.
///
/// Always in `[0, 1440)`.
pub fn duration_minutes(start: &str, end: &str) -> Result<u32, ParseError> {
    let start = parse_clock_time(start)?;
    let end = parse_clock_time(end)?;
    Ok((end + MINUTES_PER_DAY - start) % MINUTES_PER_DAY)
}

/// Render minutes since midnight back to `"h:mm AM/PM"`.
pub fn format_clock_time(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    let (hour, minute) = (minutes / 60, minutes % 60);
    let (hour, marker) = match hour {
        0 => (12, "AM"),
        1..=11 => (hour, "AM"),
        12 => (12, "PM"),
        _ => (hour - 12, "PM"),
    };
    format!("{hour}:{minute:02} {marker}")
}

/// Convert minutes since midnight to a [`NaiveTime`].
pub fn to_naive_time(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_num_seconds_from_midnight_opt((minutes % MINUTES_PER_DAY) * 60, 0)
}

/// Source of the current festival-local wall-clock time.
pub trait Clock: Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;
}

/// Reads the host's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    /// Create a clock that reports `now` until moved.
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: NaiveDateTime) {
        match self.now.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
