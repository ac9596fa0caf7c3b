//! Notification scheduling engine.
//!
//! Turns a favorited performance plus the user's offset list into
//! dispatched notifications, and keeps the ledger of live handles so they
//! can be cancelled later. Every ledger mutation is flushed to the store
//! under [`KEY_NOTIFICATION_LEDGER`].
//!
//! Dispatch, cancel and persistence failures are logged and never abort a
//! batch. Only malformed performances (bad clock text, unknown day) are
//! returned as errors.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::dispatcher::{Dispatcher, NotificationHandle};
use super::ledger::NotificationLedger;
use super::recurring::{RecurringPlan, ReminderKind};
use crate::calendar::FestivalCalendar;
use crate::clock::{Clock, parse_clock_time, to_naive_time};
use crate::error::{FestivalError, ParseError, Result};
use crate::keyed_lock::KeyedLocks;
use crate::lineup::{Performance, PerformanceId};
use crate::storage::{KEY_NOTIFICATION_LEDGER, KeyValueStore, load_json, save_json};

/// Counts from one `schedule_for` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleOutcome {
    /// Notifications accepted by the dispatcher.
    pub scheduled: usize,
    /// Offsets whose fire time had already passed.
    pub skipped_past: usize,
    /// Offsets the dispatcher rejected.
    pub failed: usize,
}

/// Counts from one `reschedule_all` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RescheduleOutcome {
    /// Handles cancelled across all previous entries.
    pub cancelled: usize,
    /// Notifications dispatched for the favorited set.
    pub scheduled: usize,
    /// Favorited performances that could not be scheduled at all.
    pub failed_performances: Vec<PerformanceId>,
}

/// Reminder text for one offset.
#[must_use]
pub fn reminder_message(performance: &Performance, offset_minutes: u32) -> String {
    if offset_minutes == 0 {
        format!("{} is now live at {}", performance.name, performance.stage)
    } else {
        format!(
            "{} is performing at {} in {} minutes",
            performance.name, performance.stage, offset_minutes
        )
    }
}

/// Owns the notification ledger and drives the dispatcher.
pub struct NotificationEngine {
    dispatcher: Arc<dyn Dispatcher>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    calendar: FestivalCalendar,
    ledger: Mutex<NotificationLedger>,
    performance_locks: KeyedLocks<PerformanceId>,
    recurring_lock: Mutex<()>,
    persist_lock: Mutex<()>,
}

impl NotificationEngine {
    pub fn new(
        dispatcher: Arc<dyn Dispatcher>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        calendar: FestivalCalendar,
    ) -> Self {
        Self {
            dispatcher,
            store,
            clock,
            calendar,
            ledger: Mutex::new(NotificationLedger::default()),
            performance_locks: KeyedLocks::new(),
            recurring_lock: Mutex::new(()),
            persist_lock: Mutex::new(()),
        }
    }

    pub fn calendar(&self) -> &FestivalCalendar {
        &self.calendar
    }

    /// Restore the ledger from the store. A missing or unreadable ledger
    /// starts empty.
    pub async fn load(&self) {
        let loaded = match load_json::<NotificationLedger>(&*self.store, KEY_NOTIFICATION_LEDGER)
            .await
        {
            Ok(Some(mut ledger)) => {
                ledger.prune();
                ledger
            }
            Ok(None) => NotificationLedger::default(),
            Err(e) => {
                warn!("notification ledger unreadable, starting empty: {e}");
                NotificationLedger::default()
            }
        };
        let entries = loaded.performance_ids().len();
        *self.ledger.lock().await = loaded;
        info!("notification ledger loaded with {entries} performance entries");
    }

    /// Write the current ledger. Snapshot and write happen under
    /// `persist_lock`, so the last write always holds the latest ledger.
    async fn flush(&self) {
        let _persist = self.persist_lock.lock().await;
        let snapshot = self.ledger.lock().await.clone();
        if let Err(e) = save_json(&*self.store, KEY_NOTIFICATION_LEDGER, &snapshot).await {
            error!("failed to persist notification ledger: {e}");
        }
    }

    /// Absolute start instant of a performance.
    pub fn start_instant(&self, performance: &Performance) -> Result<NaiveDateTime> {
        let minutes = parse_clock_time(&performance.start)?;
        let date = self
            .calendar
            .date_for(performance.day)
            .ok_or(FestivalError::Calendar(performance.day))?;
        let time = to_naive_time(minutes)
            .ok_or_else(|| ParseError::Range(performance.start.clone()))?;
        Ok(date.and_time(time))
    }

    /// Replace any reminders for `performance` with one per offset.
    ///
    /// # Errors
    ///
    /// Returns [`FestivalError::Parse`] or [`FestivalError::Calendar`] when
    /// the performance start cannot be resolved. Existing reminders are
    /// cancelled first either way.
    pub async fn schedule_for(
        &self,
        performance: &Performance,
        offsets: &[u32],
    ) -> Result<ScheduleOutcome> {
        let _guard = self.performance_locks.lock(performance.id).await;
        self.cancel_locked(performance.id).await;

        let start = self.start_instant(performance)?;
        let now = self.clock.now();
        let mut outcome = ScheduleOutcome::default();
        let mut handles = Vec::with_capacity(offsets.len());

        for &offset in offsets {
            let fire_at = start - Duration::minutes(i64::from(offset));
            if fire_at <= now {
                outcome.skipped_past += 1;
                continue;
            }
            let message = reminder_message(performance, offset);
            match self.dispatcher.schedule(&message, fire_at).await {
                Ok(handle) => {
                    debug!("scheduled {handle} for {} at {fire_at}", performance.id);
                    handles.push(handle);
                    outcome.scheduled += 1;
                }
                Err(e) => {
                    warn!(
                        "reminder {offset}m for performance {} not scheduled: {e}",
                        performance.id
                    );
                    outcome.failed += 1;
                }
            }
        }

        if !handles.is_empty() {
            self.ledger.lock().await.insert(performance.id, handles);
            self.flush().await;
        }
        info!(
            "performance {} reminders: {} scheduled, {} past, {} failed",
            performance.id, outcome.scheduled, outcome.skipped_past, outcome.failed
        );
        Ok(outcome)
    }

    /// Cancel every reminder recorded for `performance`. Returns the number
    /// of handles removed from the ledger.
    pub async fn cancel_for(&self, performance: &Performance) -> usize {
        let _guard = self.performance_locks.lock(performance.id).await;
        self.cancel_locked(performance.id).await
    }

    async fn cancel_locked(&self, id: PerformanceId) -> usize {
        let handles = self.ledger.lock().await.remove(id);
        if handles.is_empty() {
            return 0;
        }
        self.cancel_handles(&handles).await;
        self.flush().await;
        debug!("cancelled {} reminders for performance {id}", handles.len());
        handles.len()
    }

    async fn cancel_handles(&self, handles: &[NotificationHandle]) {
        for handle in handles {
            if let Err(e) = self.dispatcher.cancel(handle).await {
                warn!("failed to cancel notification {handle}: {e}");
            }
        }
    }

    /// Cancel every performance reminder, then schedule `favorited` with
    /// `offsets`. Recurring reminders are left alone.
    pub async fn reschedule_all(
        &self,
        offsets: &[u32],
        favorited: &[Performance],
    ) -> RescheduleOutcome {
        let mut outcome = RescheduleOutcome::default();

        let ids = self.ledger.lock().await.performance_ids();
        for id in ids {
            let _guard = self.performance_locks.lock(id).await;
            outcome.cancelled += self.cancel_locked(id).await;
        }

        for performance in favorited {
            match self.schedule_for(performance, offsets).await {
                Ok(result) => outcome.scheduled += result.scheduled,
                Err(e) => {
                    warn!("cannot reschedule performance {}: {e}", performance.id);
                    outcome.failed_performances.push(performance.id);
                }
            }
        }
        info!(
            "rescheduled {} favorites: {} cancelled, {} scheduled",
            favorited.len(),
            outcome.cancelled,
            outcome.scheduled
        );
        outcome
    }

    /// Replace the reminders of `kind`. When `enabled` is false the kind is
    /// only cancelled. Returns the number of notifications dispatched.
    pub async fn schedule_recurring(
        &self,
        kind: ReminderKind,
        enabled: bool,
        plan: &RecurringPlan,
    ) -> usize {
        let _guard = self.recurring_lock.lock().await;
        self.cancel_recurring_locked(kind).await;
        if !enabled {
            return 0;
        }

        let now = self.clock.now();
        let mut handles = Vec::new();
        for fire_at in plan.fire_times(&self.calendar) {
            if fire_at <= now {
                continue;
            }
            match self.dispatcher.schedule(kind.message(), fire_at).await {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!("{kind} reminder at {fire_at} not scheduled: {e}"),
            }
        }

        let count = handles.len();
        if count > 0 {
            self.ledger.lock().await.set_recurring(kind, handles);
            self.flush().await;
        }
        info!("{kind} reminders: {count} scheduled");
        count
    }

    /// Cancel all reminders of `kind`. Returns the number cancelled.
    pub async fn cancel_recurring(&self, kind: ReminderKind) -> usize {
        let _guard = self.recurring_lock.lock().await;
        self.cancel_recurring_locked(kind).await
    }

    async fn cancel_recurring_locked(&self, kind: ReminderKind) -> usize {
        let handles = self.ledger.lock().await.take_recurring(kind);
        if handles.is_empty() {
            return 0;
        }
        self.cancel_handles(&handles).await;
        self.flush().await;
        handles.len()
    }

    /// Cancel everything through the dispatcher and clear the ledger.
    pub async fn cancel_everything(&self) {
        let _guard = self.recurring_lock.lock().await;
        if let Err(e) = self.dispatcher.cancel_all().await {
            warn!("cancel-all request failed: {e}");
        }
        self.ledger.lock().await.clear();
        self.flush().await;
        info!("all notifications cancelled");
    }

    pub async fn handles_for(&self, id: PerformanceId) -> Vec<NotificationHandle> {
        self.ledger.lock().await.handles(id).to_vec()
    }

    pub async fn recurring_handles(&self, kind: ReminderKind) -> Vec<NotificationHandle> {
        self.ledger.lock().await.recurring(kind).to_vec()
    }

    pub async fn ledger_snapshot(&self) -> NotificationLedger {
        self.ledger.lock().await.clone()
    }
}
