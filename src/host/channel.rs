//! Host command channel and router.
//!
//! A [`HostCommandClient`] sends validated command envelopes to a
//! [`HostCommandServer`] over an mpsc channel and awaits the response on a
//! oneshot. Events (notification requests for the shell) flow the other way
//! on a broadcast channel.

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{FestivalError, Result};
use crate::host::contract::{CommandEnvelope, EventEnvelope, ResponseEnvelope};
use crate::host::handler::FestivalCommandHandler;
use crate::notify::DispatchEvent;

struct HostCommandRequest {
    envelope: CommandEnvelope,
    response_tx: oneshot::Sender<Result<ResponseEnvelope>>,
}

#[derive(Clone)]
pub struct HostCommandClient {
    request_tx: mpsc::Sender<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl HostCommandClient {
    pub async fn send(&self, envelope: CommandEnvelope) -> Result<ResponseEnvelope> {
        envelope.validate().map_err(|e| {
            FestivalError::Command(format!(
                "invalid host command envelope {}: {}",
                envelope.request_id, e
            ))
        })?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(HostCommandRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| {
                FestivalError::Channel(format!("failed to send host command request: {e}"))
            })?;

        response_rx
            .await
            .map_err(|e| FestivalError::Channel(format!("host command response dropped: {e}")))?
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }

    /// Sender for events that should reach the shell.
    #[must_use]
    pub fn event_sender(&self) -> broadcast::Sender<EventEnvelope> {
        self.event_tx.clone()
    }
}

pub struct HostCommandServer {
    request_rx: mpsc::Receiver<HostCommandRequest>,
    handler: FestivalCommandHandler,
}

#[must_use]
pub fn command_channel(
    request_capacity: usize,
    event_capacity: usize,
    handler: FestivalCommandHandler,
) -> (HostCommandClient, HostCommandServer) {
    let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));
    (
        HostCommandClient {
            request_tx,
            event_tx,
        },
        HostCommandServer {
            request_rx,
            handler,
        },
    )
}

impl HostCommandServer {
    /// Handle requests one at a time until every client is dropped.
    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            let response = self.handler.route(&request.envelope).await;
            let _ = request.response_tx.send(response);
        }
    }
}

/// Event envelope for a dispatcher request.
#[must_use]
pub fn dispatch_event_envelope(event: &DispatchEvent) -> EventEnvelope {
    let payload = match event {
        DispatchEvent::Schedule(notification) => serde_json::json!({
            "handle": notification.handle,
            "message": notification.message,
            "fire_at": notification.fire_at,
        }),
        DispatchEvent::Cancel { handle } => serde_json::json!({ "handle": handle }),
        DispatchEvent::CancelAll => serde_json::json!({}),
    };
    EventEnvelope::new(uuid::Uuid::new_v4().to_string(), event.name(), payload)
}

/// Re-publish dispatcher requests as host events until the dispatcher is
/// dropped.
pub fn forward_dispatch_events(
    mut rx: broadcast::Receiver<DispatchEvent>,
    event_tx: broadcast::Sender<EventEnvelope>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let _ = event_tx.send(dispatch_event_envelope(&event));
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "dispatch forwarder lagged; events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::app::FestivalApp;
    use crate::clock::FixedClock;
    use crate::config::FestivalConfig;
    use crate::host::contract::CommandName;
    use crate::lineup::Lineup;
    use crate::notify::{EventDispatcher, NotificationHandle, ScheduledNotification};
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;
    use std::sync::Arc;

    async fn client() -> HostCommandClient {
        let dispatcher = Arc::new(EventDispatcher::new(16));
        let now = NaiveDate::from_ymd_opt(2025, 6, 12)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let app = FestivalApp::init(
            FestivalConfig::default(),
            Lineup::default(),
            Arc::new(MemoryStore::new()),
            dispatcher,
            Arc::new(FixedClock::new(now)),
        )
        .await
        .unwrap();
        let (client, server) =
            command_channel(8, 8, FestivalCommandHandler::new(Arc::new(app)));
        tokio::spawn(server.run());
        client
    }

    #[tokio::test]
    async fn ping_round_trips_through_server() {
        let client = client().await;
        let resp = client
            .send(CommandEnvelope::new(
                "req-1",
                CommandName::HostPing,
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert!(resp.ok);
        assert_eq!(resp.payload["pong"], true);
    }

    #[tokio::test]
    async fn invalid_envelope_is_rejected_before_routing() {
        let client = client().await;
        let mut envelope =
            CommandEnvelope::new("req-1", CommandName::HostPing, serde_json::json!({}));
        envelope.v = 9;
        assert!(client.send(envelope).await.is_err());
    }

    #[tokio::test]
    async fn dispatch_events_are_forwarded() {
        let dispatcher = EventDispatcher::new(8);
        let (event_tx, mut event_rx) = broadcast::channel(8);
        let forwarder = forward_dispatch_events(dispatcher.subscribe(), event_tx);

        let _ = crate::notify::Dispatcher::cancel_all(&dispatcher).await;
        let event = event_rx.recv().await.unwrap();
        assert_eq!(event.event, "notification.cancel_all");

        drop(dispatcher);
        forwarder.await.unwrap();
    }

    #[test]
    fn schedule_event_payload_carries_fire_time() {
        let fire_at = NaiveDate::from_ymd_opt(2025, 6, 13)
            .unwrap()
            .and_hms_opt(19, 45, 0)
            .unwrap();
        let envelope = dispatch_event_envelope(&DispatchEvent::Schedule(ScheduledNotification {
            handle: NotificationHandle("h1".to_owned()),
            message: "Band is performing at What Stage in 15 minutes".to_owned(),
            fire_at,
        }));
        assert_eq!(envelope.event, "notification.schedule");
        assert_eq!(envelope.payload["handle"], "h1");
        assert_eq!(envelope.payload["fire_at"], "2025-06-13T19:45:00");
    }
}
