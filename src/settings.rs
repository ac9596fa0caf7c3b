//! Reminder preferences: offsets before each favorited set plus the
//! hydration and sunscreen toggles.
//!
//! Saving is the only mutation. It persists both keys, then rebuilds every
//! performance reminder from the new offsets and re-arms the recurring
//! reminders.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::config::{MAX_OFFSETS, RemindersConfig};
use crate::error::{FestivalError, Result};
use crate::lineup::Performance;
use crate::notify::{NotificationEngine, ReminderKind};
use crate::storage::{
    KEY_NOTIFICATION_TIMES, KEY_REMINDER_TOGGLES, KeyValueStore, load_json, save_json,
};

/// Current reminder preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Minutes before start, largest first.
    pub offsets: Vec<u32>,
    pub hydration: bool,
    pub sunscreen: bool,
}

impl NotificationSettings {
    pub fn reminder_enabled(&self, kind: ReminderKind) -> bool {
        match kind {
            ReminderKind::Hydration => self.hydration,
            ReminderKind::Sunscreen => self.sunscreen,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct ReminderToggles {
    #[serde(default)]
    hydration: bool,
    #[serde(default)]
    sunscreen: bool,
}

/// Deduplicate and order offsets largest-first.
///
/// # Errors
///
/// Returns [`FestivalError::Settings`] when more than [`MAX_OFFSETS`]
/// distinct values are supplied.
pub fn normalize_offsets(offsets: &[u32]) -> Result<Vec<u32>> {
    let mut normalized = offsets.to_vec();
    normalized.sort_unstable_by(|a, b| b.cmp(a));
    normalized.dedup();
    if normalized.len() > MAX_OFFSETS {
        return Err(FestivalError::Settings(format!(
            "at most {MAX_OFFSETS} reminder times allowed, got {}",
            normalized.len()
        )));
    }
    Ok(normalized)
}

/// Owner of the reminder preferences.
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
    engine: Arc<NotificationEngine>,
    reminders: RemindersConfig,
    current: RwLock<NotificationSettings>,
    save_lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        engine: Arc<NotificationEngine>,
        reminders: RemindersConfig,
    ) -> Self {
        let current = NotificationSettings {
            offsets: normalize_offsets(&reminders.default_offsets).unwrap_or_default(),
            hydration: false,
            sunscreen: false,
        };
        Self {
            store,
            engine,
            reminders,
            current: RwLock::new(current),
            save_lock: Mutex::new(()),
        }
    }

    /// Read persisted preferences. Missing or unreadable values keep the
    /// configured defaults.
    pub async fn load(&self) {
        let mut current = self.current.write().await;
        match load_json::<Vec<u32>>(&*self.store, KEY_NOTIFICATION_TIMES).await {
            Ok(Some(offsets)) => match normalize_offsets(&offsets) {
                Ok(offsets) => current.offsets = offsets,
                Err(e) => warn!("ignoring stored reminder times: {e}"),
            },
            Ok(None) => {}
            Err(e) => warn!("reminder times unreadable, using defaults: {e}"),
        }
        match load_json::<ReminderToggles>(&*self.store, KEY_REMINDER_TOGGLES).await {
            Ok(Some(toggles)) => {
                current.hydration = toggles.hydration;
                current.sunscreen = toggles.sunscreen;
            }
            Ok(None) => {}
            Err(e) => warn!("reminder toggles unreadable, using defaults: {e}"),
        }
        info!(
            "settings loaded: offsets {:?}, hydration {}, sunscreen {}",
            current.offsets, current.hydration, current.sunscreen
        );
    }

    pub async fn current(&self) -> NotificationSettings {
        self.current.read().await.clone()
    }

    pub async fn offsets(&self) -> Vec<u32> {
        self.current.read().await.offsets.clone()
    }

    /// Apply new preferences.
    ///
    /// Cancels and reschedules every reminder for `favorited` with the new
    /// offsets, then re-arms both recurring kinds. Nothing changes when the
    /// offsets are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`FestivalError::Settings`] for more than [`MAX_OFFSETS`]
    /// offsets.
    pub async fn save(
        &self,
        offsets: &[u32],
        hydration: bool,
        sunscreen: bool,
        favorited: &[Performance],
    ) -> Result<NotificationSettings> {
        let offsets = normalize_offsets(offsets)?;
        let _save = self.save_lock.lock().await;
        let saved = NotificationSettings {
            offsets,
            hydration,
            sunscreen,
        };
        *self.current.write().await = saved.clone();

        if let Err(e) = save_json(&*self.store, KEY_NOTIFICATION_TIMES, &saved.offsets).await {
            error!("failed to persist reminder times: {e}");
        }
        let toggles = ReminderToggles {
            hydration,
            sunscreen,
        };
        if let Err(e) = save_json(&*self.store, KEY_REMINDER_TOGGLES, &toggles).await {
            error!("failed to persist reminder toggles: {e}");
        }

        self.engine.reschedule_all(&saved.offsets, favorited).await;
        for kind in ReminderKind::ALL {
            self.engine
                .schedule_recurring(kind, saved.reminder_enabled(kind), self.reminders.plan(kind))
                .await;
        }
        Ok(saved)
    }
}
