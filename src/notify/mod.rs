//! Reminder notifications for favorited performances and recurring
//! wellbeing prompts.

pub mod dispatcher;
pub mod engine;
pub mod ledger;
pub mod recurring;

pub use dispatcher::{
    DispatchEvent, Dispatcher, EventDispatcher, MemoryDispatcher, NotificationHandle,
    ScheduledNotification,
};
pub use engine::{NotificationEngine, RescheduleOutcome, ScheduleOutcome, reminder_message};
pub use ledger::NotificationLedger;
pub use recurring::{RecurringPlan, ReminderKind};
