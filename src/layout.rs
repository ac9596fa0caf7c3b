//! Time-grid layout for one festival operating day.
//!
//! An operating day runs from noon on its calendar date to 5 AM the next
//! morning (1020 minutes). Performances that start after midnight are folded
//! into the tail of the same window, so a set at 1:00 AM sits below a set at
//! 11:00 PM rather than above the noon line.

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::calendar::{FestivalCalendar, FestivalDay};
use crate::clock::{Clock, MINUTES_PER_DAY, NOON_MINUTE, duration_minutes, parse_clock_time};
use crate::error::ParseError;
use crate::lineup::{Performance, PerformanceId, Stage};

/// Minutes from the window start (noon) to its end (5 AM next day).
pub const WINDOW_MINUTES: u32 = 1020;

/// Performances starting before this minute belong to the previous evening.
pub const TAIL_END_MINUTE: u32 = 5 * 60;

/// Grid scaling options supplied by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Vertical units per minute of schedule.
    pub pixels_per_minute: f32,
    /// Minute of day the grid starts at.
    pub schedule_start_minute: u32,
    /// Fixed offset added to every `top` (stage header height).
    pub header_offset: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            pixels_per_minute: 1.0,
            schedule_start_minute: NOON_MINUTE,
            header_offset: 0.0,
        }
    }
}

impl LayoutOptions {
    /// Default options at the given scale.
    #[must_use]
    pub fn with_scale(pixels_per_minute: f32) -> Self {
        Self {
            pixels_per_minute,
            ..Self::default()
        }
    }

    /// Minutes from the window start for a minute-of-day, in `[0, 1440)`.
    #[must_use]
    pub fn offset_from_window_start(&self, minute_of_day: u32) -> u32 {
        let start = self.schedule_start_minute % MINUTES_PER_DAY;
        (minute_of_day % MINUTES_PER_DAY + MINUTES_PER_DAY - start) % MINUTES_PER_DAY
    }

    /// Check the options against the fixed noon-to-5 AM window.
    ///
    /// The bucketing rule and the now-line both assume the grid starts at
    /// noon, so any other `schedule_start_minute` is rejected.
    pub fn validate(&self) -> Result<(), String> {
        let ppm = self.pixels_per_minute;
        if !ppm.is_finite() || ppm <= 0.0 {
            return Err(format!("pixels_per_minute must be positive, got {ppm}"));
        }
        if !self.header_offset.is_finite() {
            return Err(format!(
                "header_offset must be finite, got {}",
                self.header_offset
            ));
        }
        if self.schedule_start_minute != NOON_MINUTE {
            return Err(format!(
                "schedule_start_minute must be {NOON_MINUTE} (noon), got {}",
                self.schedule_start_minute
            ));
        }
        Ok(())
    }
}

/// A performance positioned on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedPerformance {
    pub performance_id: PerformanceId,
    pub stage: Stage,
    /// Stage column index.
    pub column: usize,
    pub top: f32,
    pub height: f32,
    pub start_minute: u32,
    pub duration_minutes: u32,
}

/// Current-time indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NowLine {
    pub visible: bool,
    pub top: f32,
}

impl NowLine {
    const HIDDEN: NowLine = NowLine {
        visible: false,
        top: 0.0,
    };
}

/// Whether a performance starting at `start_minute` belongs on `selected`'s grid.
///
/// Evening sets (noon or later) belong to their own day label. Sets before
/// 5 AM belong to the grid of the day after their label.
#[must_use]
pub fn belongs_to_day(day: FestivalDay, start_minute: u32, selected: FestivalDay) -> bool {
    (day == selected && start_minute >= NOON_MINUTE)
        || (day == selected.predecessor() && start_minute < TAIL_END_MINUTE)
}

/// Place the performances that belong to `selected_day`.
///
/// Results are ordered by column, then by `top`.
///
/// # Errors
///
/// Returns the first [`ParseError`] met among the performances carrying
/// `selected_day`'s label or its predecessor's.
pub fn place_performances(
    performances: &[Performance],
    selected_day: FestivalDay,
    options: &LayoutOptions,
) -> Result<Vec<PlacedPerformance>, ParseError> {
    let ppm = options.pixels_per_minute;
    let mut placed = Vec::new();

    for performance in performances {
        if performance.day != selected_day && performance.day != selected_day.predecessor() {
            continue;
        }

        let start_minute = parse_clock_time(&performance.start)?;
        let duration = duration_minutes(&performance.start, &performance.end)?;
        if !belongs_to_day(performance.day, start_minute, selected_day) {
            continue;
        }

        let offset = options.offset_from_window_start(start_minute);
        placed.push(PlacedPerformance {
            performance_id: performance.id,
            stage: performance.stage,
            column: performance.stage.column(),
            top: offset as f32 * ppm + options.header_offset,
            height: duration as f32 * ppm,
            start_minute,
            duration_minutes: duration,
        });
    }

    placed.sort_by(|a, b| a.column.cmp(&b.column).then(a.top.total_cmp(&b.top)));
    tracing::debug!(
        day = %selected_day,
        count = placed.len(),
        "placed performances"
    );
    Ok(placed)
}

/// Position of the now-line on `selected_day`'s grid at wall-clock `now`.
///
/// Hidden unless `now` falls in `[date 12:00, date+1 05:00)` for the date
/// the calendar assigns to `selected_day`.
#[must_use]
pub fn now_line_position(
    selected_day: FestivalDay,
    now: NaiveDateTime,
    calendar: &FestivalCalendar,
    options: &LayoutOptions,
) -> NowLine {
    let Some(date) = calendar.date_for(selected_day) else {
        return NowLine::HIDDEN;
    };
    let window_start = date.and_time(chrono::NaiveTime::MIN) + Duration::minutes(NOON_MINUTE.into());
    let window_end = window_start + Duration::minutes(WINDOW_MINUTES.into());
    if now < window_start || now >= window_end {
        return NowLine::HIDDEN;
    }

    let minute_of_day = now.hour() * 60 + now.minute();
    let offset = options.offset_from_window_start(minute_of_day);
    NowLine {
        visible: true,
        top: offset as f32 * options.pixels_per_minute + options.header_offset,
    }
}

/// [`now_line_position`] reading the time from `clock`.
#[must_use]
pub fn now_line(
    selected_day: FestivalDay,
    clock: &dyn Clock,
    calendar: &FestivalCalendar,
    options: &LayoutOptions,
) -> NowLine {
    now_line_position(selected_day, clock.now(), calendar, options)
}

/// Hour labels down the side of the grid, `"12 PM"` through `"5 AM"`.
#[must_use]
pub fn hour_labels() -> Vec<String> {
    (0..=WINDOW_MINUTES / 60)
        .map(|i| {
            let hour = (12 + i) % 24;
            match hour {
                0 => "12 AM".to_owned(),
                12 => "12 PM".to_owned(),
                h if h > 12 => format!("{} PM", h - 12),
                h => format!("{h} AM"),
            }
        })
        .collect()
}

/// Total grid height, excluding the header.
#[must_use]
pub fn window_height(options: &LayoutOptions) -> f32 {
    WINDOW_MINUTES as f32 * options.pixels_per_minute
}
