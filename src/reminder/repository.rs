//! Persistence boundary for the reminder collection.
//!
//! The store loads everything once at startup and writes each mutation
//! through one of the per-record methods. [`ReminderRepository::save`] replaces
//! the whole collection (bulk import). [`crate::db::repository::SqliteRepository`]
//! is the durable implementation; [`MemoryRepository`] keeps records in process.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local, Utc};

use crate::error::Result;

use super::types::Reminder;

pub trait ReminderRepository: Send + Sync {
    /// All stored reminders, in storage (insertion) order.
    fn load(&self) -> Result<Vec<Reminder>>;

    /// Replace the stored collection with `reminders`.
    fn save(&self, reminders: &[Reminder]) -> Result<()>;

    /// The stored record for `id`, as another process may have left it.
    fn get(&self, id: &str) -> Result<Option<Reminder>>;

    fn insert(&self, reminder: &Reminder) -> Result<()>;

    /// Overwrite the stored record. Returns `false` when no record with this
    /// id exists; nothing is written then.
    fn update(&self, reminder: &Reminder) -> Result<bool>;

    /// Move an active reminder to `datetime`. Returns `false`, writing
    /// nothing, when the record is gone or no longer active.
    fn reschedule(&self, id: &str, datetime: DateTime<Local>, updated_at: DateTime<Utc>) -> Result<bool>;

    fn remove(&self, id: &str) -> Result<()>;

    /// A counter that changes when another process commits to the same
    /// storage. `None` when the backend cannot tell.
    fn revision(&self) -> Result<Option<i64>> {
        Ok(None)
    }
}

/// In-process repository. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    records: Mutex<Vec<Reminder>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Reminder>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    fn records(&self) -> std::sync::MutexGuard<'_, Vec<Reminder>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReminderRepository for MemoryRepository {
    fn load(&self) -> Result<Vec<Reminder>> {
        Ok(self.records().clone())
    }

    fn save(&self, reminders: &[Reminder]) -> Result<()> {
        *self.records() = reminders.to_vec();
        Ok(())
    }

    fn insert(&self, reminder: &Reminder) -> Result<()> {
        self.records().push(reminder.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Reminder>> {
        Ok(self.records().iter().find(|r| r.id == id).cloned())
    }

    fn update(&self, reminder: &Reminder) -> Result<bool> {
        let mut records = self.records();
        match records.iter_mut().find(|r| r.id == reminder.id) {
            Some(slot) => {
                *slot = reminder.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn reschedule(&self, id: &str, datetime: DateTime<Local>, updated_at: DateTime<Utc>) -> Result<bool> {
        let mut records = self.records();
        match records.iter_mut().find(|r| r.id == id && r.is_active) {
            Some(slot) => {
                slot.datetime = datetime;
                slot.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove(&self, id: &str) -> Result<()> {
        self.records().retain(|r| r.id != id);
        Ok(())
    }
}
