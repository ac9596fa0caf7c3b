//! Notification dispatcher seam.
//!
//! The delivery platform is opaque: it accepts a message and an absolute
//! fire time and hands back a handle that can later be cancelled.
//! [`MemoryDispatcher`] records calls for tests; [`EventDispatcher`]
//! forwards requests to the native shell as events.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::DispatchError;

/// Opaque identifier of one scheduled notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationHandle(pub String);

impl std::fmt::Display for NotificationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A notification accepted by a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub handle: NotificationHandle,
    pub message: String,
    pub fire_at: NaiveDateTime,
}

/// Notification delivery platform.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Schedule `message` to fire at `fire_at` (festival-local time).
    async fn schedule(
        &self,
        message: &str,
        fire_at: NaiveDateTime,
    ) -> Result<NotificationHandle, DispatchError>;

    /// Cancel one previously scheduled notification.
    async fn cancel(&self, handle: &NotificationHandle) -> Result<(), DispatchError>;

    /// Cancel every notification this app has scheduled.
    async fn cancel_all(&self) -> Result<(), DispatchError>;
}

#[derive(Debug, Default)]
struct MemoryDispatcherState {
    next_id: u64,
    pending: Vec<ScheduledNotification>,
    cancelled: Vec<NotificationHandle>,
    schedule_calls: usize,
    fail_messages_containing: Option<String>,
    fail_cancels: bool,
}

/// In-memory dispatcher that records every request.
///
/// Handles are `mem-1`, `mem-2`, ... in call order. Failures can be
/// injected per message substring, or for all cancels.
#[derive(Debug, Default)]
pub struct MemoryDispatcher {
    state: Mutex<MemoryDispatcherState>,
}

impl MemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MemoryDispatcherState) -> R) -> R {
        match self.state.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// Reject every schedule request whose message contains `needle`.
    pub fn fail_messages_containing(&self, needle: impl Into<String>) {
        let needle = needle.into();
        self.with_state(|s| s.fail_messages_containing = Some(needle));
    }

    /// Reject every cancel request.
    pub fn fail_cancels(&self, fail: bool) {
        self.with_state(|s| s.fail_cancels = fail);
    }

    /// Notifications still scheduled, in dispatch order.
    pub fn pending(&self) -> Vec<ScheduledNotification> {
        self.with_state(|s| s.pending.clone())
    }

    /// Handles cancelled individually, in call order.
    pub fn cancelled(&self) -> Vec<NotificationHandle> {
        self.with_state(|s| s.cancelled.clone())
    }

    /// Number of schedule requests received, including rejected ones.
    pub fn schedule_calls(&self) -> usize {
        self.with_state(|s| s.schedule_calls)
    }
}

#[async_trait]
impl Dispatcher for MemoryDispatcher {
    async fn schedule(
        &self,
        message: &str,
        fire_at: NaiveDateTime,
    ) -> Result<NotificationHandle, DispatchError> {
        self.with_state(|s| {
            s.schedule_calls += 1;
            if let Some(needle) = &s.fail_messages_containing
                && message.contains(needle.as_str())
            {
                return Err(DispatchError(format!("rejected {message:?}")));
            }
            s.next_id += 1;
            let handle = NotificationHandle(format!("mem-{}", s.next_id));
            s.pending.push(ScheduledNotification {
                handle: handle.clone(),
                message: message.to_owned(),
                fire_at,
            });
            Ok(handle)
        })
    }

    async fn cancel(&self, handle: &NotificationHandle) -> Result<(), DispatchError> {
        self.with_state(|s| {
            if s.fail_cancels {
                return Err(DispatchError(format!("cannot cancel {handle}")));
            }
            s.pending.retain(|n| &n.handle != handle);
            s.cancelled.push(handle.clone());
            Ok(())
        })
    }

    async fn cancel_all(&self) -> Result<(), DispatchError> {
        self.with_state(|s| {
            if s.fail_cancels {
                return Err(DispatchError("cannot cancel all".to_owned()));
            }
            s.pending.clear();
            Ok(())
        })
    }
}

/// Request forwarded to the native shell by [`EventDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    Schedule(ScheduledNotification),
    Cancel { handle: NotificationHandle },
    CancelAll,
}

impl DispatchEvent {
    /// Event name on the host wire.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Schedule(_) => "notification.schedule",
            Self::Cancel { .. } => "notification.cancel",
            Self::CancelAll => "notification.cancel_all",
        }
    }
}

/// Dispatcher that assigns uuid handles and broadcasts each request.
///
/// Delivery is the shell's job: it listens on the channel and registers
/// the local notification with the OS.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    tx: broadcast::Sender<DispatchEvent>,
}

impl EventDispatcher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.tx.subscribe()
    }

    fn send(&self, event: DispatchEvent) -> Result<(), DispatchError> {
        self.tx
            .send(event)
            .map(|_| ())
            .map_err(|_| DispatchError("no notification listener attached".to_owned()))
    }
}

#[async_trait]
impl Dispatcher for EventDispatcher {
    async fn schedule(
        &self,
        message: &str,
        fire_at: NaiveDateTime,
    ) -> Result<NotificationHandle, DispatchError> {
        let handle = NotificationHandle(uuid::Uuid::new_v4().to_string());
        self.send(DispatchEvent::Schedule(ScheduledNotification {
            handle: handle.clone(),
            message: message.to_owned(),
            fire_at,
        }))?;
        Ok(handle)
    }

    async fn cancel(&self, handle: &NotificationHandle) -> Result<(), DispatchError> {
        self.send(DispatchEvent::Cancel {
            handle: handle.clone(),
        })
    }

    async fn cancel_all(&self) -> Result<(), DispatchError> {
        self.send(DispatchEvent::CancelAll)
    }
}
