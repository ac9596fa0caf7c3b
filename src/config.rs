//! Configuration for the festival schedule engine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::calendar::FestivalCalendar;
use crate::error::{FestivalError, Result};
use crate::layout::LayoutOptions;
use crate::notify::{RecurringPlan, ReminderKind};

/// Largest number of reminder offsets a user may pick.
pub const MAX_OFFSETS: usize = 5;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FestivalConfig {
    /// Lineup JSON file (None = the bundled path next to the config).
    pub lineup_path: Option<PathBuf>,
    /// Day label to calendar date.
    pub calendar: FestivalCalendar,
    /// Grid geometry.
    pub layout: LayoutOptions,
    /// Reminder defaults and recurring plans.
    pub reminders: RemindersConfig,
    /// Persistence location.
    pub storage: StorageConfig,
}

/// Reminder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemindersConfig {
    /// Offsets (minutes before start) used until the user saves their own.
    pub default_offsets: Vec<u32>,
    pub hydration: RecurringPlan,
    pub sunscreen: RecurringPlan,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            default_offsets: vec![15, 0],
            hydration: RecurringPlan::hydration(),
            sunscreen: RecurringPlan::sunscreen(),
        }
    }
}

impl RemindersConfig {
    /// Plan for a recurring reminder kind.
    pub fn plan(&self, kind: ReminderKind) -> &RecurringPlan {
        match kind {
            ReminderKind::Hydration => &self.hydration,
            ReminderKind::Sunscreen => &self.sunscreen,
        }
    }
}

/// Where store files live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store directory (None = `festival_dirs::store_dir()`).
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(crate::festival_dirs::store_dir)
    }
}

impl FestivalConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| FestivalError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| FestivalError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::festival_dirs::config_file()
    }

    /// Load from `path` when it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let missing = self.calendar.missing_days();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|d| d.as_str()).collect();
            return Err(FestivalError::Config(format!(
                "calendar has no date for {}",
                names.join(", ")
            )));
        }
        self.layout
            .validate()
            .map_err(|e| FestivalError::Config(format!("layout.{e}")))?;
        if self.reminders.default_offsets.len() > MAX_OFFSETS {
            return Err(FestivalError::Config(format!(
                "reminders.default_offsets holds {} values, at most {MAX_OFFSETS} allowed",
                self.reminders.default_offsets.len()
            )));
        }
        for kind in ReminderKind::ALL {
            self.reminders
                .plan(kind)
                .validate()
                .map_err(|e| FestivalError::Config(format!("reminders.{kind}: {e}")))?;
        }
        Ok(())
    }
}
