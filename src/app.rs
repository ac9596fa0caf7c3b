//! Application wiring: one engine, one settings store and one favorites
//! store sharing a key-value store, dispatcher and clock.

use std::sync::Arc;

use tracing::{info, warn};

use crate::calendar::FestivalDay;
use crate::clock::Clock;
use crate::config::FestivalConfig;
use crate::error::{FestivalError, Result};
use crate::favorites::FavoritesStore;
use crate::layout::{NowLine, PlacedPerformance, now_line, place_performances};
use crate::lineup::{Lineup, Performance, PerformanceId};
use crate::notify::{Dispatcher, NotificationEngine};
use crate::settings::{NotificationSettings, SettingsStore};
use crate::storage::KeyValueStore;

pub struct FestivalApp {
    config: FestivalConfig,
    lineup: Lineup,
    clock: Arc<dyn Clock>,
    engine: Arc<NotificationEngine>,
    settings: Arc<SettingsStore>,
    favorites: Arc<FavoritesStore>,
}

impl FestivalApp {
    /// Validate `config`, build the stores and load their persisted state.
    ///
    /// # Errors
    ///
    /// Returns [`FestivalError::Config`] when the configuration is invalid.
    pub async fn init(
        config: FestivalConfig,
        lineup: Lineup,
        store: Arc<dyn KeyValueStore>,
        dispatcher: Arc<dyn Dispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        for performance in lineup.malformed() {
            warn!(
                "performance {} ({}) has unreadable times {:?} - {:?}",
                performance.id, performance.name, performance.start, performance.end
            );
        }

        let engine = Arc::new(NotificationEngine::new(
            dispatcher,
            Arc::clone(&store),
            Arc::clone(&clock),
            config.calendar.clone(),
        ));
        let settings = Arc::new(SettingsStore::new(
            Arc::clone(&store),
            Arc::clone(&engine),
            config.reminders.clone(),
        ));
        let favorites = Arc::new(FavoritesStore::new(
            store,
            Arc::clone(&engine),
            Arc::clone(&settings),
        ));

        engine.load().await;
        settings.load().await;
        favorites.load().await;
        info!("festival app ready with {} performances", lineup.len());

        Ok(Self {
            config,
            lineup,
            clock,
            engine,
            settings,
            favorites,
        })
    }

    pub fn config(&self) -> &FestivalConfig {
        &self.config
    }

    pub fn lineup(&self) -> &Lineup {
        &self.lineup
    }

    pub fn engine(&self) -> &Arc<NotificationEngine> {
        &self.engine
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn favorites(&self) -> &Arc<FavoritesStore> {
        &self.favorites
    }

    /// Grid placement for `day`, optionally restricted to favorites.
    pub async fn grid(&self, day: FestivalDay, favorites_only: bool) -> Result<Vec<PlacedPerformance>> {
        let placed = if favorites_only {
            let favorited = self.favorites.favorited_performances(self.lineup.performances()).await;
            place_performances(&favorited, day, &self.config.layout)?
        } else {
            place_performances(self.lineup.performances(), day, &self.config.layout)?
        };
        Ok(placed)
    }

    pub fn now_line(&self, day: FestivalDay) -> NowLine {
        now_line(day, &*self.clock, &self.config.calendar, &self.config.layout)
    }

    /// Toggle a favorite by id and return the new flag.
    ///
    /// # Errors
    ///
    /// Returns [`FestivalError::Lineup`] for an id not in the lineup.
    pub async fn toggle_favorite(&self, id: PerformanceId) -> Result<bool> {
        let performance = self
            .lineup
            .get(id)
            .ok_or_else(|| FestivalError::Lineup(format!("no performance with id {id}")))?;
        Ok(self.favorites.toggle_favorite(performance).await)
    }

    pub async fn favorited(&self) -> Vec<Performance> {
        self.favorites
            .favorited_performances(self.lineup.performances())
            .await
    }

    /// Save reminder settings and rebuild every reminder.
    pub async fn save_settings(
        &self,
        offsets: &[u32],
        hydration: bool,
        sunscreen: bool,
    ) -> Result<NotificationSettings> {
        let favorited = self.favorited().await;
        self.settings
            .save(offsets, hydration, sunscreen, &favorited)
            .await
    }
}
