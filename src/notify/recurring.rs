//! Recurring reminder kinds and their hourly plans.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calendar::{FestivalCalendar, FestivalDay};

/// Fixed-text reminders repeated through each festival day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Hydration,
    Sunscreen,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 2] = [ReminderKind::Hydration, ReminderKind::Sunscreen];

    /// Notification text for this kind.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Hydration => "Stay hydrated! Time to drink some water.",
            Self::Sunscreen => "Time to reapply sunscreen!",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hydration => "hydration",
            Self::Sunscreen => "sunscreen",
        }
    }
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a recurring reminder fires: every `step_hours` from `start_hour`
/// through `end_hour` (inclusive) on each listed day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurringPlan {
    pub start_hour: u32,
    pub end_hour: u32,
    pub step_hours: u32,
    /// Days to cover. Empty means every day in the calendar.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<FestivalDay>,
}

impl Default for RecurringPlan {
    fn default() -> Self {
        Self::hydration()
    }
}

impl RecurringPlan {
    pub fn new(start_hour: u32, end_hour: u32, step_hours: u32) -> Self {
        Self {
            start_hour,
            end_hour,
            step_hours,
            days: Vec::new(),
        }
    }

    /// Noon to 10 PM, every two hours.
    pub fn hydration() -> Self {
        Self::new(12, 22, 2)
    }

    /// Noon to 6 PM, every two hours.
    pub fn sunscreen() -> Self {
        Self::new(12, 18, 2)
    }

    /// Default plan for a kind.
    pub fn for_kind(kind: ReminderKind) -> Self {
        match kind {
            ReminderKind::Hydration => Self::hydration(),
            ReminderKind::Sunscreen => Self::sunscreen(),
        }
    }

    /// Restrict the plan to the given days.
    #[must_use]
    pub fn on_days(mut self, days: impl IntoIterator<Item = FestivalDay>) -> Self {
        self.days = days.into_iter().collect();
        self
    }

    /// Hours of the day the reminder fires. A zero step is treated as one.
    pub fn hours(&self) -> impl Iterator<Item = u32> + '_ {
        let end = self.end_hour.min(23);
        (self.start_hour..=end).step_by(self.step_hours.max(1) as usize)
    }

    fn dates(&self, calendar: &FestivalCalendar) -> Vec<NaiveDate> {
        if self.days.is_empty() {
            return calendar.dates();
        }
        self.days
            .iter()
            .filter_map(|day| calendar.date_for(*day))
            .collect()
    }

    /// Every fire instant of the plan, in chronological order.
    pub fn fire_times(&self, calendar: &FestivalCalendar) -> Vec<NaiveDateTime> {
        let mut times: Vec<NaiveDateTime> = self
            .dates(calendar)
            .into_iter()
            .flat_map(|date| {
                self.hours()
                    .filter_map(move |hour| date.and_hms_opt(hour, 0, 0))
                    .collect::<Vec<_>>()
            })
            .collect();
        times.sort();
        times
    }

    /// Check that the hour range is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(format!(
                "hours must be 0-23, got {}..{}",
                self.start_hour, self.end_hour
            ));
        }
        if self.start_hour > self.end_hour {
            return Err(format!(
                "start_hour {} is after end_hour {}",
                self.start_hour, self.end_hour
            ));
        }
        if self.step_hours == 0 {
            return Err("step_hours must be at least 1".to_owned());
        }
        Ok(())
    }
}
