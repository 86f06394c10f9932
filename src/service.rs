//! The reminder service: store plus scheduler behind one handle.
//!
//! Callers hold a [`ReminderService`] and never touch the collection or the
//! timers directly. Mutations that change when (or whether) a reminder fires
//! re-arm it; deletion and deactivation cancel its pending action.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::Result;
use crate::notify::{Notifier, PermissionGate};
use crate::reminder::{NewReminder, Reminder, ReminderPatch, ReminderStore};
use crate::scheduler::{ArmOutcome, Scheduler};

pub struct ReminderService {
    store: Arc<ReminderStore>,
    scheduler: Scheduler,
    rehydrated: AtomicBool,
}

impl ReminderService {
    pub fn new(
        store: Arc<ReminderStore>,
        gate: Arc<PermissionGate>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let scheduler = Scheduler::new(Arc::clone(&store), gate, notifier, clock);
        Self {
            store,
            scheduler,
            rehydrated: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<ReminderStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Create a reminder and arm it straight away.
    pub fn create(&self, data: NewReminder) -> Result<Reminder> {
        let reminder = self.store.create(data)?;
        self.scheduler.arm(&reminder);
        Ok(reminder)
    }

    /// Apply `patch`; re-arms when the datetime, repeat rule or active flag changed.
    pub fn update(&self, id: &str, patch: ReminderPatch) -> Result<Option<Reminder>> {
        let reschedule = patch.touches_schedule();
        let updated = self.store.update(id, patch)?;
        match &updated {
            Some(reminder) if reschedule => {
                self.scheduler.arm(reminder);
            }
            Some(_) => {}
            // Unknown, or deleted by another process.
            None => {
                self.scheduler.cancel(id);
            }
        }
        Ok(updated)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        self.scheduler.cancel(id);
        self.store.delete(id)
    }

    /// Flip the active flag: deactivating cancels, reactivating re-arms when
    /// the reminder is still in the future.
    pub fn toggle_active(&self, id: &str) -> Result<Option<Reminder>> {
        let toggled = self.store.toggle_active(id)?;
        match &toggled {
            Some(reminder) if reminder.is_active => {
                self.scheduler.arm(reminder);
            }
            _ => {
                self.scheduler.cancel(id);
            }
        }
        Ok(toggled)
    }

    pub fn get(&self, id: &str) -> Option<Reminder> {
        self.store.get(id)
    }

    pub fn all(&self) -> Vec<Reminder> {
        self.store.all()
    }

    pub fn upcoming(&self, limit: usize) -> Vec<Reminder> {
        self.store.upcoming(limit)
    }

    pub fn today(&self) -> Vec<Reminder> {
        self.store.today()
    }

    /// Re-arm every active reminder after the store has been loaded.
    ///
    /// Timers do not survive a restart, so this runs once at process start,
    /// before any other mutation. Later calls do nothing and return 0.
    /// Returns how many reminders were armed.
    pub fn rehydrate(&self) -> usize {
        if self.rehydrated.swap(true, Ordering::SeqCst) {
            tracing::warn!("rehydrate called more than once, ignoring");
            return 0;
        }
        let armed = self.arm_all_active();
        tracing::info!(armed, total = self.store.len(), "reminders rehydrated");
        armed
    }

    /// Reload from storage and rebuild every timer. Used when another process
    /// changed the database underneath us.
    pub fn resync(&self) -> Result<usize> {
        self.store.reload()?;
        self.scheduler.cancel_all();
        let armed = self.arm_all_active();
        tracing::info!(armed, total = self.store.len(), "reminders resynced");
        Ok(armed)
    }

    /// Cancel every pending action.
    pub fn shutdown(&self) {
        let cancelled = self.scheduler.cancel_all();
        tracing::info!(cancelled, "scheduler stopped");
    }

    fn arm_all_active(&self) -> usize {
        self.store
            .active()
            .iter()
            .map(|reminder| self.scheduler.arm(reminder))
            .filter(ArmOutcome::is_armed)
            .count()
    }
}
