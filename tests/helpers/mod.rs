#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, TimeZone};
use chime::clock::ManualClock;
use chime::notify::{Notifier, Permission, PermissionGate};
use chime::reminder::{MemoryRepository, NewReminder, ReminderRepository, ReminderStore, Repeat};
use chime::service::ReminderService;

/// A notification as the surface received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub title: String,
    pub body: String,
    pub tag: String,
}

/// Notifier that records instead of showing anything.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str, tag: &str) {
        self.sent.lock().unwrap().push(Sent {
            title: title.to_string(),
            body: body.to_string(),
            tag: tag.to_string(),
        });
    }
}

/// Local wall-clock time.
pub fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub struct Harness {
    pub service: ReminderService,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub repo: Arc<dyn ReminderRepository>,
}

/// A service over an in-memory repository with a frozen clock.
pub fn harness(now: DateTime<Local>, permission: Permission) -> Harness {
    harness_with_repo(Arc::new(MemoryRepository::new()), now, permission)
}

pub fn harness_with_repo(
    repo: Arc<dyn ReminderRepository>,
    now: DateTime<Local>,
    permission: Permission,
) -> Harness {
    let clock = Arc::new(ManualClock::new(now));
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(ReminderStore::open(repo.clone(), clock.clone()).unwrap());
    let service = ReminderService::new(
        store,
        Arc::new(PermissionGate::with_state(permission)),
        notifier.clone(),
        clock.clone(),
    );
    Harness {
        service,
        clock,
        notifier,
        repo,
    }
}

pub fn new_reminder(title: &str, datetime: DateTime<Local>, repeat: Option<Repeat>) -> NewReminder {
    NewReminder {
        title: Some(title.to_string()),
        message: Some(format!("{title} body")),
        datetime: Some(datetime),
        repeat,
        ..Default::default()
    }
}
