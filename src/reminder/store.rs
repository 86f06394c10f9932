//! The authoritative reminder collection.
//!
//! [`ReminderStore`] owns the in-memory list, validates input, and writes
//! every mutation through its [`ReminderRepository`] before applying it in
//! memory, so a failed write leaves both sides unchanged. Mutations on an
//! unknown id are silent no-ops (`None` / `false`). The store never arms
//! timers; see [`crate::service::ReminderService`] for that.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, Utc};

use crate::clock::Clock;
use crate::error::{ReminderError, Result};

use super::repository::ReminderRepository;
use super::types::{NewReminder, Reminder, ReminderPatch};

pub struct ReminderStore {
    reminders: Mutex<Vec<Reminder>>,
    repo: Arc<dyn ReminderRepository>,
    clock: Arc<dyn Clock>,
}

/// Outcome of [`ReminderStore::import`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

impl ReminderStore {
    /// Load the persisted collection and wrap it.
    pub fn open(repo: Arc<dyn ReminderRepository>, clock: Arc<dyn Clock>) -> Result<Self> {
        let reminders = repo.load()?;
        tracing::debug!(count = reminders.len(), "reminder store loaded");
        Ok(Self {
            reminders: Mutex::new(reminders),
            repo,
            clock,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Reminder>> {
        self.reminders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self, data: NewReminder) -> Result<Reminder> {
        let datetime = data
            .datetime
            .ok_or_else(|| ReminderError::InvalidDateTime("missing datetime".into()))?;
        let now = Utc::now();

        let reminder = Reminder {
            id: uuid::Uuid::now_v7().to_string(),
            title: data.title.unwrap_or_default(),
            message: data.message.unwrap_or_default(),
            datetime,
            repeat: data.repeat,
            is_active: data.is_active.unwrap_or(true),
            linked_to: data.linked_to,
            created_at: now,
            updated_at: now,
        };

        let mut reminders = self.lock();
        self.repo.insert(&reminder)?;
        reminders.push(reminder.clone());

        tracing::info!(id = %reminder.id, due = %reminder.datetime, repeat = ?reminder.repeat, "reminder created");
        Ok(reminder)
    }

    /// Merge `patch` into the reminder with this id. `None` if there is none.
    pub fn update(&self, id: &str, patch: ReminderPatch) -> Result<Option<Reminder>> {
        let mut reminders = self.lock();
        let Some(slot) = reminders.iter_mut().find(|r| r.id == id) else {
            tracing::debug!(id, "update on unknown reminder ignored");
            return Ok(None);
        };

        let mut updated = slot.clone();
        patch.apply(&mut updated);
        updated.updated_at = Utc::now();

        if !self.repo.update(&updated)? {
            tracing::info!(id, "reminder deleted elsewhere, dropping it");
            reminders.retain(|r| r.id != id);
            return Ok(None);
        }
        *slot = updated.clone();

        tracing::debug!(id, due = %updated.datetime, active = updated.is_active, "reminder updated");
        Ok(Some(updated))
    }

    /// Move an active reminder to its next occurrence.
    ///
    /// Only the due instant is written, and only while the stored record is
    /// still active. Otherwise the stored state wins: the local copy is
    /// replaced by it (or dropped) and `None` is returned.
    pub fn reschedule(&self, id: &str, next: DateTime<Local>) -> Result<Option<Reminder>> {
        let mut reminders = self.lock();
        let now = Utc::now();

        if !self.repo.reschedule(id, next, now)? {
            let stored = self.repo.get(id)?;
            tracing::info!(id, exists = stored.is_some(), "reminder changed elsewhere, not rescheduling");
            sync_slot(&mut reminders, id, stored);
            return Ok(None);
        }

        let rescheduled = match reminders.iter().position(|r| r.id == id) {
            Some(index) => {
                let slot = &mut reminders[index];
                slot.datetime = next;
                slot.updated_at = now;
                Some(slot.clone())
            }
            None => {
                let stored = self.repo.get(id)?;
                sync_slot(&mut reminders, id, stored.clone());
                stored
            }
        };

        tracing::debug!(id, due = %next, "reminder rescheduled");
        Ok(rescheduled)
    }

    /// Re-read one reminder from the repository and adopt it. Returns the
    /// stored record, or `None` when it no longer exists.
    pub fn refresh(&self, id: &str) -> Result<Option<Reminder>> {
        let stored = self.repo.get(id)?;
        sync_slot(&mut self.lock(), id, stored.clone());
        Ok(stored)
    }

    /// Remove the reminder. Returns whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut reminders = self.lock();
        let Some(index) = reminders.iter().position(|r| r.id == id) else {
            tracing::debug!(id, "delete on unknown reminder ignored");
            return Ok(false);
        };

        self.repo.remove(id)?;
        reminders.remove(index);

        tracing::info!(id, "reminder deleted");
        Ok(true)
    }

    /// Flip `is_active`. Returns the updated record, or `None` if unknown.
    pub fn toggle_active(&self, id: &str) -> Result<Option<Reminder>> {
        let current = {
            let reminders = self.lock();
            reminders.iter().find(|r| r.id == id).map(|r| r.is_active)
        };
        match current {
            Some(active) => self.update(
                id,
                ReminderPatch {
                    is_active: Some(!active),
                    ..ReminderPatch::default()
                },
            ),
            None => Ok(None),
        }
    }

    pub fn get(&self, id: &str) -> Option<Reminder> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    /// Every reminder, ascending by due instant.
    pub fn all(&self) -> Vec<Reminder> {
        let mut all = self.lock().clone();
        all.sort_by_key(|r| r.datetime);
        all
    }

    /// Active reminders in storage order.
    pub fn active(&self) -> Vec<Reminder> {
        self.lock().iter().filter(|r| r.is_active).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Active reminders due strictly after now, soonest first, at most `limit`.
    pub fn upcoming(&self, limit: usize) -> Vec<Reminder> {
        let now = self.clock.now();
        let mut upcoming: Vec<Reminder> = self
            .lock()
            .iter()
            .filter(|r| r.is_active && r.datetime > now)
            .cloned()
            .collect();
        upcoming.sort_by_key(|r| r.datetime);
        upcoming.truncate(limit);
        upcoming
    }

    /// Active reminders due on the current local calendar day, storage order.
    pub fn today(&self) -> Vec<Reminder> {
        let today = self.clock.now().date_naive();
        self.lock()
            .iter()
            .filter(|r| r.is_active && r.datetime.date_naive() == today)
            .cloned()
            .collect()
    }

    /// Re-read the collection from the repository. Returns the new count.
    pub fn reload(&self) -> Result<usize> {
        let loaded = self.repo.load()?;
        let count = loaded.len();
        *self.lock() = loaded;
        tracing::debug!(count, "reminder store reloaded");
        Ok(count)
    }

    /// Bring in externally produced records.
    ///
    /// With `replace`, the stored collection becomes exactly `records`
    /// (duplicate ids within `records` keep the first). Otherwise records whose
    /// id already exists are skipped.
    pub fn import(&self, records: Vec<Reminder>, replace: bool) -> Result<ImportSummary> {
        let mut reminders = self.lock();
        let mut seen: HashSet<String> = if replace {
            HashSet::new()
        } else {
            reminders.iter().map(|r| r.id.clone()).collect()
        };

        let mut summary = ImportSummary::default();
        let mut accepted = Vec::with_capacity(records.len());
        for record in records {
            if seen.insert(record.id.clone()) {
                accepted.push(record);
            } else {
                summary.skipped += 1;
            }
        }
        summary.imported = accepted.len();

        if replace {
            self.repo.save(&accepted)?;
            *reminders = accepted;
        } else {
            for record in accepted {
                self.repo.insert(&record)?;
                reminders.push(record);
            }
        }

        tracing::info!(imported = summary.imported, skipped = summary.skipped, replace, "reminders imported");
        Ok(summary)
    }
}

/// Make the local copy of `id` match `stored`.
fn sync_slot(reminders: &mut Vec<Reminder>, id: &str, stored: Option<Reminder>) {
    let position = reminders.iter().position(|r| r.id == id);
    match (position, stored) {
        (Some(index), Some(record)) => reminders[index] = record,
        (Some(index), None) => {
            reminders.remove(index);
        }
        (None, Some(record)) => reminders.push(record),
        (None, None) => {}
    }
}
