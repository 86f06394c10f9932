//! Local reminders with recurring schedules and desktop notifications.
//!
//! chime keeps reminders in SQLite and runs a small daemon that fires each
//! one at its due instant. A reminder has a title, an optional message, a
//! local due time, an optional recurrence, and an active flag:
//!
//! | Repeat | Next occurrence after firing |
//! |--------|------------------------------|
//! | none | stays in the list, never fires again |
//! | daily | +1 calendar day, same wall-clock time |
//! | weekly | +7 calendar days |
//! | monthly | +1 calendar month, clamped to the month's last day |
//!
//! # Architecture
//!
//! - **Storage**: SQLite behind the [`reminder::ReminderRepository`] trait,
//!   with an audit log and forward-only migrations
//! - **Store**: [`reminder::ReminderStore`] owns the in-memory collection and
//!   persists every mutation
//! - **Scheduler**: one cancellable tokio task per armed reminder,
//!   re-reading the record at fire time
//! - **Notifications**: a cached [`notify::PermissionGate`] and a pluggable
//!   [`notify::Notifier`] (terminal or external command)
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, repository, and health checks
//! - [`reminder`]: Reminder types, recurrence arithmetic, and the store
//! - [`notify`]: Permission gate and notification surfaces
//! - [`scheduler`]: Deferred firing and recurrence re-arming
//! - [`service`]: Store plus scheduler facade, including startup rehydration
//! - [`daemon`]: `chime serve` process wiring

pub mod cli;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod db;
pub mod error;
pub mod notify;
pub mod reminder;
pub mod scheduler;
pub mod service;

pub use error::ReminderError;
