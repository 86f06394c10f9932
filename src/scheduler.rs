//! Turns due instants into deferred notifications.
//!
//! Each armed reminder owns exactly one spawned tokio task that sleeps until
//! the reminder is due. Tasks are tracked by reminder id together with a
//! generation number: arming again aborts the previous task and bumps the
//! generation, and a task that wakes only fires if its generation is still
//! the current one. The firing itself runs on the blocking pool. At fire time
//! the record is re-read from storage, so a reminder deactivated or deleted
//! after arming, here or by another process, never notifies. Advancing a
//! recurring reminder writes only its due instant, and only while the stored
//! record is still active.
//!
//! Lock order: the pending map and the store are never locked together.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::clock::Clock;
use crate::notify::{Notifier, PermissionGate};
use crate::reminder::recurrence::next_after;
use crate::reminder::{Reminder, ReminderStore};

/// What [`Scheduler::arm`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// A deferred action is pending.
    Armed { due: DateTime<Local> },
    PermissionNotGranted,
    Inactive,
    /// Due at or before now; past-due reminders are not fired on arm.
    PastDue,
    /// Called outside a tokio runtime.
    NoRuntime,
}

impl ArmOutcome {
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }
}

/// What a firing did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Deleted before it fired.
    Missing,
    /// Deactivated before it fired.
    Inactive,
    /// Shown. `next` is the new due instant for recurring reminders.
    Notified { next: Option<DateTime<Local>> },
    /// Permission is not granted: nothing shown, recurrence still advanced.
    Suppressed { next: Option<DateTime<Local>> },
}

struct Pending {
    generation: u64,
    due: DateTime<Local>,
    handle: AbortHandle,
}

struct Inner {
    store: Arc<ReminderStore>,
    gate: Arc<PermissionGate>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    pending: Mutex<HashMap<String, Pending>>,
    next_generation: AtomicU64,
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(
        store: Arc<ReminderStore>,
        gate: Arc<PermissionGate>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                gate,
                notifier,
                clock,
                pending: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    pub fn gate(&self) -> Arc<PermissionGate> {
        Arc::clone(&self.inner.gate)
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, Pending>> {
        self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm a deferred action for `reminder`, replacing any pending one.
    pub fn arm(&self, reminder: &Reminder) -> ArmOutcome {
        self.cancel(&reminder.id);

        if !self.inner.gate.is_granted() {
            tracing::debug!(id = %reminder.id, permission = %self.inner.gate.state(), "not arming: permission not granted");
            return ArmOutcome::PermissionNotGranted;
        }
        if !reminder.is_active {
            return ArmOutcome::Inactive;
        }

        let delay = match (reminder.datetime - self.inner.clock.now()).to_std() {
            Ok(delay) if !delay.is_zero() => delay,
            _ => {
                tracing::debug!(id = %reminder.id, due = %reminder.datetime, "not arming: past due");
                return ArmOutcome::PastDue;
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(id = %reminder.id, "not arming: no async runtime");
            return ArmOutcome::NoRuntime;
        };

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let id = reminder.id.clone();
        let scheduler = self.clone();

        // Hold the map while spawning so the task cannot claim its slot
        // before the slot exists.
        let mut pending = self.pending();
        let task = runtime.spawn({
            let id = id.clone();
            let runtime = runtime.clone();
            async move {
                tokio::time::sleep(delay).await;
                // Firing reads and writes storage, which may wait on a lock.
                let fired = tokio::task::spawn_blocking(move || {
                    let _guard = runtime.enter();
                    scheduler.fire_armed(&id, generation);
                })
                .await;
                if let Err(e) = fired {
                    tracing::error!(error = %e, "reminder firing task failed");
                }
            }
        });
        pending.insert(
            id.clone(),
            Pending {
                generation,
                due: reminder.datetime,
                handle: task.abort_handle(),
            },
        );
        drop(pending);

        tracing::debug!(id = %id, due = %reminder.datetime, delay_secs = delay.as_secs(), "reminder armed");
        ArmOutcome::Armed {
            due: reminder.datetime,
        }
    }

    /// Abort the pending action for `id`. Returns whether one existed.
    pub fn cancel(&self, id: &str) -> bool {
        match self.pending().remove(id) {
            Some(old) => {
                old.handle.abort();
                tracing::debug!(id, generation = old.generation, "pending reminder cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) -> usize {
        let drained: Vec<Pending> = self.pending().drain().map(|(_, p)| p).collect();
        for pending in &drained {
            pending.handle.abort();
        }
        drained.len()
    }

    pub fn is_armed(&self, id: &str) -> bool {
        self.pending().contains_key(id)
    }

    /// When the pending action for `id` is due, if any.
    pub fn armed_for(&self, id: &str) -> Option<DateTime<Local>> {
        self.pending().get(id).map(|p| p.due)
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    /// Run the firing behaviour for `id` now, cancelling any pending action.
    pub fn fire(&self, id: &str) -> FireOutcome {
        self.cancel(id);
        self.fire_current(id)
    }

    /// Entry point for a woken task. Fires only if `generation` still owns
    /// the slot; a re-arm or cancel that raced the wake-up wins.
    fn fire_armed(&self, id: &str, generation: u64) {
        {
            let mut pending = self.pending();
            match pending.get(id) {
                Some(p) if p.generation == generation => {
                    pending.remove(id);
                }
                _ => {
                    tracing::debug!(id, generation, "superseded timer woke, ignoring");
                    return;
                }
            }
        }
        self.fire_current(id);
    }

    fn fire_current(&self, id: &str) -> FireOutcome {
        // Storage is authoritative: another process may have changed or
        // deleted the reminder since it was armed.
        let current = match self.inner.store.refresh(id) {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(id, error = %e, "failed to re-read reminder, using cached copy");
                self.inner.store.get(id)
            }
        };
        let Some(reminder) = current else {
            tracing::debug!(id, "reminder deleted before firing");
            return FireOutcome::Missing;
        };
        if !reminder.is_active {
            tracing::debug!(id, "reminder deactivated before firing");
            return FireOutcome::Inactive;
        }

        let shown = self.inner.gate.is_granted();
        if shown {
            self.inner
                .notifier
                .notify(&reminder.title, &reminder.message, &reminder.id);
        } else {
            tracing::info!(id, "reminder due but notifications are not permitted");
        }

        let next = reminder.repeat.and_then(|repeat| self.advance(&reminder, repeat));

        if shown {
            FireOutcome::Notified { next }
        } else {
            FireOutcome::Suppressed { next }
        }
    }

    /// Move a recurring reminder to its next occurrence, persist, re-arm.
    fn advance(&self, reminder: &Reminder, repeat: crate::reminder::Repeat) -> Option<DateTime<Local>> {
        let now = self.inner.clock.now();
        let Some(next) = next_after(repeat, &reminder.datetime, &now) else {
            tracing::warn!(id = %reminder.id, %repeat, "no next occurrence, leaving reminder as is");
            return None;
        };

        match self.inner.store.reschedule(&reminder.id, next) {
            Ok(Some(updated)) => {
                tracing::info!(id = %updated.id, next = %next, %repeat, "recurring reminder advanced");
                self.arm(&updated);
                Some(next)
            }
            Ok(None) => {
                tracing::info!(id = %reminder.id, "reminder deleted or deactivated elsewhere, not re-arming");
                None
            }
            Err(e) => {
                tracing::error!(id = %reminder.id, error = %e, "failed to persist next occurrence");
                None
            }
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending_count())
            .finish()
    }
}
