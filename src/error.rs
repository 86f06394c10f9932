//! Error taxonomy for the reminder core.
//!
//! Application code (CLI, daemon, config) works in `anyhow`; everything under
//! [`crate::reminder`], [`crate::db`] and [`crate::scheduler`] returns
//! [`ReminderError`] so callers can tell a bad datetime from a storage failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReminderError {
    /// Notifications are unavailable or were declined.
    #[error("notification permission not granted")]
    PermissionDenied,

    /// No reminder with this id. The store itself reports absence as
    /// `None`/`false`; this variant is for callers that want it to be loud.
    #[error("reminder not found: {0}")]
    NotFound(String),

    /// Missing, malformed, or non-existent local datetime.
    #[error("invalid datetime: {0:?}")]
    InvalidDateTime(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = ReminderError> = std::result::Result<T, E>;
