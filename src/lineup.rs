//! Performance records and lineup loading.
//!
//! Lineup files are JSON arrays. Both the snake_case field names used here
//! and the column names of the published timesheet export (`"AOTD #"`,
//! `"Artist"`, `"Scheduled"`, `"StartTime"`, ...) are accepted.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calendar::FestivalDay;
use crate::clock::parse_clock_time;
use crate::error::{FestivalError, Result};

/// Stable numeric identity of a performance.
pub type PerformanceId = u32;

/// Festival stage. Declaration order is the grid column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "What Stage")]
    What,
    #[serde(rename = "Which Stage")]
    Which,
    #[serde(rename = "The Other", alias = "The Other Stage")]
    TheOther,
    #[serde(rename = "Infinity Stage")]
    Infinity,
    #[serde(rename = "This Tent")]
    ThisTent,
    #[serde(rename = "That Tent")]
    ThatTent,
    #[serde(rename = "Who Stage")]
    Who,
}

impl Stage {
    /// All stages in column order.
    pub const ALL: [Stage; 7] = [
        Stage::What,
        Stage::Which,
        Stage::TheOther,
        Stage::Infinity,
        Stage::ThisTent,
        Stage::ThatTent,
        Stage::Who,
    ];

    /// Zero-based grid column.
    #[must_use]
    pub fn column(self) -> usize {
        self as usize
    }

    /// Display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::What => "What Stage",
            Self::Which => "Which Stage",
            Self::TheOther => "The Other",
            Self::Infinity => "Infinity Stage",
            Self::ThisTent => "This Tent",
            Self::ThatTent => "That Tent",
            Self::Who => "Who Stage",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scheduled artist appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    #[serde(alias = "AOTD #")]
    pub id: PerformanceId,
    #[serde(alias = "Artist")]
    pub name: String,
    #[serde(alias = "Stage")]
    pub stage: Stage,
    #[serde(alias = "Scheduled")]
    pub day: FestivalDay,
    /// Start, `"h:mm AM/PM"`.
    #[serde(alias = "StartTime")]
    pub start: String,
    /// End, `"h:mm AM/PM"`. Earlier than `start` when crossing midnight.
    #[serde(alias = "EndTime")]
    pub end: String,
    #[serde(default, alias = "Description")]
    pub description: String,
    #[serde(default, alias = "Genres")]
    pub genres: String,
}

impl Performance {
    /// Build a performance with empty description fields.
    pub fn new(
        id: PerformanceId,
        name: impl Into<String>,
        stage: Stage,
        day: FestivalDay,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            stage,
            day,
            start: start.into(),
            end: end.into(),
            description: String::new(),
            genres: String::new(),
        }
    }
}

/// The full festival lineup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lineup {
    performances: Vec<Performance>,
}

impl Lineup {
    pub fn new(performances: Vec<Performance>) -> Self {
        Self { performances }
    }

    /// Parse a lineup JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`FestivalError::Lineup`] for invalid JSON or duplicate ids.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let lineup: Self = serde_json::from_str(json)
            .map_err(|e| FestivalError::Lineup(format!("cannot parse lineup: {e}")))?;
        lineup.check_unique_ids()?;
        Ok(lineup)
    }

    /// Load a lineup JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    fn check_unique_ids(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for performance in &self.performances {
            if !seen.insert(performance.id) {
                return Err(FestivalError::Lineup(format!(
                    "duplicate performance id {}",
                    performance.id
                )));
            }
        }
        Ok(())
    }

    /// Performances whose start or end time does not parse.
    ///
    /// The layout engine refuses malformed entries, so callers can use this
    /// to report or skip them up front.
    pub fn malformed(&self) -> Vec<&Performance> {
        self.performances
            .iter()
            .filter(|p| parse_clock_time(&p.start).is_err() || parse_clock_time(&p.end).is_err())
            .collect()
    }

    pub fn get(&self, id: PerformanceId) -> Option<&Performance> {
        self.performances.iter().find(|p| p.id == id)
    }

    pub fn performances(&self) -> &[Performance] {
        &self.performances
    }

    pub fn len(&self) -> usize {
        self.performances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.performances.is_empty()
    }
}
