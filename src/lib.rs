//! Festival: schedule engine for a multi-stage music festival.
//!
//! Lays performances out on a per-day time grid, keeps the user's
//! favorites, and schedules reminder notifications before each favorited
//! set.
//!
//! # Architecture
//!
//! - **Clock**: `h:mm AM/PM` parsing and an injectable wall clock
//! - **Calendar**: day label to calendar date
//! - **Layout**: grid placement for the noon to 5 AM operating window
//! - **Favorites / Settings**: persisted user state behind a key-value store
//! - **Notify**: reminder scheduling, the handle ledger and recurring reminders
//! - **Host**: newline-delimited JSON bridge for the native shell

pub mod app;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod error;
pub mod favorites;
pub mod festival_dirs;
pub mod host;
pub mod keyed_lock;
pub mod layout;
pub mod lineup;
pub mod notify;
pub mod settings;
pub mod storage;

pub use app::FestivalApp;
pub use calendar::{FestivalCalendar, FestivalDay};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::FestivalConfig;
pub use error::{FestivalError, Result};
pub use lineup::{Lineup, Performance, PerformanceId, Stage};
