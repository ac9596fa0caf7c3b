//! Command handler backed by a [`FestivalApp`].

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::app::FestivalApp;
use crate::calendar::FestivalDay;
use crate::error::{FestivalError, Result};
use crate::host::contract::{CommandEnvelope, CommandName, EVENT_VERSION, ResponseEnvelope};
use crate::layout::{hour_labels, window_height};
use crate::lineup::PerformanceId;

#[derive(Debug, Deserialize)]
struct GridPayload {
    day: String,
    #[serde(default)]
    favorites_only: bool,
}

#[derive(Debug, Deserialize)]
struct DayPayload {
    day: String,
}

#[derive(Debug, Deserialize)]
struct TogglePayload {
    performance_id: PerformanceId,
}

#[derive(Debug, Deserialize)]
struct SettingsSavePayload {
    offsets: Vec<u32>,
    #[serde(default)]
    hydration: bool,
    #[serde(default)]
    sunscreen: bool,
}

/// Routes host commands to the app.
#[derive(Clone)]
pub struct FestivalCommandHandler {
    app: Arc<FestivalApp>,
}

impl FestivalCommandHandler {
    pub fn new(app: Arc<FestivalApp>) -> Self {
        Self { app }
    }

    pub fn app(&self) -> &Arc<FestivalApp> {
        &self.app
    }

    /// Route a command envelope to the matching handler.
    pub async fn route(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let id = envelope.request_id.clone();
        let payload = match envelope.command {
            CommandName::HostPing => json!({"pong": true}),
            CommandName::HostVersion => json!({
                "contract_version": EVENT_VERSION,
                "version": env!("CARGO_PKG_VERSION"),
            }),
            CommandName::LineupList => json!({
                "performances": self.app.lineup().performances(),
            }),
            CommandName::ScheduleGrid => self.handle_schedule_grid(envelope).await?,
            CommandName::ScheduleNowLine => {
                let day = parse_day(&parse_payload::<DayPayload>(envelope)?.day)?;
                serde_json::to_value(self.app.now_line(day)).map_err(encode_error)?
            }
            CommandName::ScheduleHours => json!({
                "labels": hour_labels(),
                "height": window_height(&self.app.config().layout),
            }),
            CommandName::FavoritesList => json!({
                "performance_ids": self.app.favorites().favorite_ids().await,
            }),
            CommandName::FavoritesToggle => self.handle_favorites_toggle(envelope).await?,
            CommandName::SettingsGet => {
                serde_json::to_value(self.app.settings().current().await).map_err(encode_error)?
            }
            CommandName::SettingsSave => {
                let request = parse_payload::<SettingsSavePayload>(envelope)?;
                let saved = self
                    .app
                    .save_settings(&request.offsets, request.hydration, request.sunscreen)
                    .await?;
                serde_json::to_value(saved).map_err(encode_error)?
            }
            CommandName::RuntimeStop => json!({"accepted": true}),
        };
        Ok(ResponseEnvelope::ok(id, payload))
    }

    async fn handle_schedule_grid(&self, envelope: &CommandEnvelope) -> Result<serde_json::Value> {
        let request = parse_payload::<GridPayload>(envelope)?;
        let day = parse_day(&request.day)?;
        let placements = self.app.grid(day, request.favorites_only).await?;
        Ok(json!({
            "day": day,
            "favorites_only": request.favorites_only,
            "height": window_height(&self.app.config().layout),
            "placements": placements,
        }))
    }

    async fn handle_favorites_toggle(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<serde_json::Value> {
        let request = parse_payload::<TogglePayload>(envelope)?;
        let favorited = self.app.toggle_favorite(request.performance_id).await?;
        let reminders = self
            .app
            .engine()
            .handles_for(request.performance_id)
            .await
            .len();
        Ok(json!({
            "performance_id": request.performance_id,
            "favorited": favorited,
            "reminders": reminders,
        }))
    }
}

fn parse_payload<T: DeserializeOwned>(envelope: &CommandEnvelope) -> Result<T> {
    serde_json::from_value(envelope.payload.clone()).map_err(|e| {
        FestivalError::Command(format!(
            "{} has an invalid payload: {e}",
            envelope.command.as_str()
        ))
    })
}

fn parse_day(raw: &str) -> Result<FestivalDay> {
    FestivalDay::parse(raw).ok_or_else(|| {
        FestivalError::Command(format!(
            "unknown day `{raw}` (expected Thursday/Friday/Saturday/Sunday)"
        ))
    })
}

fn encode_error(e: serde_json::Error) -> FestivalError {
    FestivalError::Command(format!("cannot encode response: {e}"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::clock::FixedClock;
    use crate::config::FestivalConfig;
    use crate::lineup::{Lineup, Performance, Stage};
    use crate::notify::MemoryDispatcher;
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;

    async fn handler() -> FestivalCommandHandler {
        let lineup = Lineup::new(vec![Performance::new(
            8,
            "Night Owls",
            Stage::ThisTent,
            FestivalDay::Saturday,
            "11:00 PM",
            "12:30 AM",
        )]);
        let now = NaiveDate::from_ymd_opt(2025, 6, 14)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap();
        let app = FestivalApp::init(
            FestivalConfig::default(),
            lineup,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryDispatcher::new()),
            Arc::new(FixedClock::new(now)),
        )
        .await
        .unwrap();
        FestivalCommandHandler::new(Arc::new(app))
    }

    fn command(name: CommandName, payload: serde_json::Value) -> CommandEnvelope {
        CommandEnvelope::new("req-1", name, payload)
    }

    #[tokio::test]
    async fn grid_accepts_short_day_labels() {
        let h = handler().await;
        let resp = h
            .route(&command(CommandName::ScheduleGrid, json!({"day": "sat"})))
            .await
            .unwrap();
        assert!(resp.ok);
        assert_eq!(resp.payload["day"], "Saturday");
        assert_eq!(resp.payload["placements"][0]["performance_id"], 8);
        assert_eq!(resp.payload["placements"][0]["top"], 660.0);
    }

    #[tokio::test]
    async fn toggle_reports_reminder_count() {
        let h = handler().await;
        let resp = h
            .route(&command(
                CommandName::FavoritesToggle,
                json!({"performance_id": 8}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.payload["favorited"], true);
        assert_eq!(resp.payload["reminders"], 2);

        let list = h
            .route(&command(CommandName::FavoritesList, json!({})))
            .await
            .unwrap();
        assert_eq!(list.payload["performance_ids"], json!([8]));
    }

    #[tokio::test]
    async fn settings_save_normalizes_offsets() {
        let h = handler().await;
        let resp = h
            .route(&command(
                CommandName::SettingsSave,
                json!({"offsets": [0, 30, 30], "sunscreen": true}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.payload["offsets"], json!([30, 0]));
        assert_eq!(resp.payload["sunscreen"], true);
        assert_eq!(resp.payload["hydration"], false);
    }

    #[tokio::test]
    async fn bad_payloads_are_command_errors() {
        let h = handler().await;
        let err = h
            .route(&command(CommandName::ScheduleGrid, json!({"day": "Monday"})))
            .await
            .unwrap_err();
        assert!(matches!(err, FestivalError::Command(_)));

        let err = h
            .route(&command(CommandName::FavoritesToggle, json!({})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("favorites.toggle"));
    }

    #[tokio::test]
    async fn hours_lists_eighteen_labels() {
        let h = handler().await;
        let resp = h
            .route(&command(CommandName::ScheduleHours, serde_json::Value::Null))
            .await
            .unwrap();
        assert_eq!(resp.payload["labels"].as_array().unwrap().len(), 18);
        assert_eq!(resp.payload["height"], 1020.0);
    }
}
