//! Favorite flags per performance.
//!
//! Toggling a favorite is the only mutation. The new flag is persisted and
//! then reminders are scheduled (favorited) or cancelled (unfavorited).
//! Neither a persistence nor a notification failure rolls the flag back.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::keyed_lock::KeyedLocks;
use crate::lineup::{Performance, PerformanceId};
use crate::notify::NotificationEngine;
use crate::settings::SettingsStore;
use crate::storage::{KEY_FAVORITES, KeyValueStore, load_json, save_json};

pub struct FavoritesStore {
    store: Arc<dyn KeyValueStore>,
    engine: Arc<NotificationEngine>,
    settings: Arc<SettingsStore>,
    flags: RwLock<BTreeMap<PerformanceId, bool>>,
    toggle_locks: KeyedLocks<PerformanceId>,
    persist_lock: Mutex<()>,
}

impl FavoritesStore {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        engine: Arc<NotificationEngine>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            store,
            engine,
            settings,
            flags: RwLock::new(BTreeMap::new()),
            toggle_locks: KeyedLocks::new(),
            persist_lock: Mutex::new(()),
        }
    }

    /// Read the persisted flags. Missing or corrupt data starts empty.
    pub async fn load(&self) {
        let flags = match load_json::<BTreeMap<PerformanceId, bool>>(&*self.store, KEY_FAVORITES)
            .await
        {
            Ok(Some(flags)) => flags,
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!("favorites unreadable, starting empty: {e}");
                BTreeMap::new()
            }
        };
        let count = flags.values().filter(|v| **v).count();
        *self.flags.write().await = flags;
        info!("loaded {count} favorites");
    }

    pub async fn is_favorited(&self, id: PerformanceId) -> bool {
        self.flags.read().await.get(&id).copied().unwrap_or(false)
    }

    /// Flip the flag for `performance` and return the new value.
    pub async fn toggle_favorite(&self, performance: &Performance) -> bool {
        let _guard = self.toggle_locks.lock(performance.id).await;

        let favorited = {
            let mut flags = self.flags.write().await;
            let favorited = !flags.get(&performance.id).copied().unwrap_or(false);
            flags.insert(performance.id, favorited);
            favorited
        };
        self.persist().await;

        if favorited {
            let offsets = self.settings.offsets().await;
            if let Err(e) = self.engine.schedule_for(performance, &offsets).await {
                warn!("reminders for performance {} not scheduled: {e}", performance.id);
            }
        } else {
            self.engine.cancel_for(performance).await;
        }
        info!(
            "performance {} {}",
            performance.id,
            if favorited { "favorited" } else { "unfavorited" }
        );
        favorited
    }

    async fn persist(&self) {
        let _persist = self.persist_lock.lock().await;
        let snapshot = self.flags.read().await.clone();
        if let Err(e) = save_json(&*self.store, KEY_FAVORITES, &snapshot).await {
            error!("failed to persist favorites: {e}");
        }
    }

    /// Favorited ids, ascending.
    pub async fn favorite_ids(&self) -> Vec<PerformanceId> {
        self.flags
            .read()
            .await
            .iter()
            .filter(|(_, favorited)| **favorited)
            .map(|(id, _)| *id)
            .collect()
    }

    /// The favorited subset of `performances`, in input order.
    pub async fn favorited_performances(&self, performances: &[Performance]) -> Vec<Performance> {
        let flags = self.flags.read().await;
        performances
            .iter()
            .filter(|p| flags.get(&p.id).copied().unwrap_or(false))
            .cloned()
            .collect()
    }
}
