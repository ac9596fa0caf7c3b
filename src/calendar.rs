//! Festival day labels and the day-to-date calendar map.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One operating day of the festival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FestivalDay {
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl FestivalDay {
    /// All days in festival order.
    pub const ALL: [FestivalDay; 4] = [
        FestivalDay::Thursday,
        FestivalDay::Friday,
        FestivalDay::Saturday,
        FestivalDay::Sunday,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// The previous day in the fixed cycle. Thursday wraps to Sunday.
    #[must_use]
    pub fn predecessor(self) -> Self {
        let len = Self::ALL.len();
        Self::ALL[(self.index() + len - 1) % len]
    }

    /// The next day in the fixed cycle. Sunday wraps to Thursday.
    #[must_use]
    pub fn successor(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Full English name, as used in lineup data.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }

    /// Parse a full or three-letter label, ignoring case.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|day| {
            let name = day.as_str().to_ascii_lowercase();
            raw == name || raw == name[..3]
        })
    }
}

impl fmt::Display for FestivalDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FestivalDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown festival day: {s:?}"))
    }
}

/// Read-only map from day label to the calendar date it runs on.
///
/// Serialized as a TOML/JSON table such as `Friday = "2025-06-13"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, NaiveDate>",
    into = "BTreeMap<String, NaiveDate>"
)]
pub struct FestivalCalendar {
    dates: BTreeMap<FestivalDay, NaiveDate>,
}

impl FestivalCalendar {
    /// Build a calendar from explicit day/date pairs.
    pub fn new(dates: impl IntoIterator<Item = (FestivalDay, NaiveDate)>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    /// Calendar whose first day (Thursday) falls on `thursday`.
    pub fn starting(thursday: NaiveDate) -> Self {
        Self::new(
            FestivalDay::ALL
                .into_iter()
                .zip(thursday.iter_days())
                .collect::<Vec<_>>(),
        )
    }

    /// Date the given day label runs on.
    pub fn date_for(&self, day: FestivalDay) -> Option<NaiveDate> {
        self.dates.get(&day).copied()
    }

    /// Reverse lookup: which day label runs on `date`.
    pub fn day_for_date(&self, date: NaiveDate) -> Option<FestivalDay> {
        self.dates
            .iter()
            .find(|(_, d)| **d == date)
            .map(|(day, _)| *day)
    }

    /// All configured dates in festival order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.dates.values().copied().collect()
    }

    /// Days that have no date configured.
    pub fn missing_days(&self) -> Vec<FestivalDay> {
        FestivalDay::ALL
            .into_iter()
            .filter(|day| !self.dates.contains_key(day))
            .collect()
    }
}

impl TryFrom<BTreeMap<String, NaiveDate>> for FestivalCalendar {
    type Error = String;

    fn try_from(table: BTreeMap<String, NaiveDate>) -> Result<Self, Self::Error> {
        table
            .into_iter()
            .map(|(label, date)| Ok((label.parse::<FestivalDay>()?, date)))
            .collect::<Result<Vec<_>, String>>()
            .map(Self::new)
    }
}

impl From<FestivalCalendar> for BTreeMap<String, NaiveDate> {
    fn from(calendar: FestivalCalendar) -> Self {
        calendar
            .dates
            .into_iter()
            .map(|(day, date)| (day.as_str().to_owned(), date))
            .collect()
    }
}

impl Default for FestivalCalendar {
    fn default() -> Self {
        // 2025 edition: Thursday 12 June through Sunday 15 June.
        match NaiveDate::from_ymd_opt(2025, 6, 12) {
            Some(thursday) => Self::starting(thursday),
            None => Self::new([]),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn predecessor_is_a_cyclic_decrement() {
        assert_eq!(FestivalDay::Friday.predecessor(), FestivalDay::Thursday);
        assert_eq!(FestivalDay::Saturday.predecessor(), FestivalDay::Friday);
        assert_eq!(FestivalDay::Sunday.predecessor(), FestivalDay::Saturday);
        assert_eq!(FestivalDay::Thursday.predecessor(), FestivalDay::Sunday);
    }

    #[test]
    fn successor_inverts_predecessor() {
        for day in FestivalDay::ALL {
            assert_eq!(day.predecessor().successor(), day);
            assert_ne!(day.predecessor(), day);
        }
    }

    #[test]
    fn parses_full_and_short_labels() {
        assert_eq!(FestivalDay::parse("Thursday"), Some(FestivalDay::Thursday));
        assert_eq!(FestivalDay::parse("fri"), Some(FestivalDay::Friday));
        assert_eq!(FestivalDay::parse(" SAT "), Some(FestivalDay::Saturday));
        assert_eq!(FestivalDay::parse("Monday"), None);
        assert!("Sun".parse::<FestivalDay>().is_ok());
    }

    #[test]
    fn default_calendar_covers_the_2025_weekend() {
        let calendar = FestivalCalendar::default();
        assert_eq!(
            calendar.date_for(FestivalDay::Friday),
            NaiveDate::from_ymd_opt(2025, 6, 13)
        );
        assert_eq!(
            calendar.day_for_date(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()),
            Some(FestivalDay::Sunday)
        );
        assert!(calendar.missing_days().is_empty());
    }

    #[test]
    fn calendar_serializes_as_a_day_table() {
        let calendar = FestivalCalendar::default();
        let json = serde_json::to_value(&calendar).unwrap();
        assert_eq!(json["Thursday"], "2025-06-12");

        let partial: FestivalCalendar =
            serde_json::from_str(r#"{"Friday":"2024-06-14"}"#).unwrap();
        assert_eq!(partial.missing_days().len(), 3);

        let unknown = serde_json::from_str::<FestivalCalendar>(r#"{"Monday":"2024-06-17"}"#);
        assert!(unknown.is_err());
    }
}
