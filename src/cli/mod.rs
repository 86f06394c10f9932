//! One-shot CLI commands.
//!
//! These edit the database directly through a [`ReminderStore`] and never arm
//! timers themselves; a running `chime serve` notices the commit and resyncs.

pub mod doctor;
pub mod edit;
pub mod export;
pub mod import;
pub mod list;

use std::sync::Arc;

use anyhow::Result;

use crate::clock::SystemClock;
use crate::config::ChimeConfig;
use crate::db::repository::SqliteRepository;
use crate::reminder::{Reminder, ReminderStore};

/// Open the configured database as a store.
pub fn open_store(config: &ChimeConfig) -> Result<ReminderStore> {
    let repo = Arc::new(SqliteRepository::open(config.resolved_db_path())?);
    Ok(ReminderStore::open(repo, Arc::new(SystemClock))?)
}

/// One-line rendering used by every listing command.
pub fn format_reminder(reminder: &Reminder) -> String {
    let mut line = format!(
        "{}  {}  {}",
        reminder.id,
        reminder.datetime.format("%Y-%m-%d %H:%M"),
        reminder.title
    );
    if let Some(repeat) = reminder.repeat {
        line.push_str(&format!("  [{repeat}]"));
    }
    if !reminder.is_active {
        line.push_str("  (inactive)");
    }
    if let Some(link) = &reminder.linked_to {
        line.push_str(&format!("  -> {}:{}", link.kind, link.id));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::{LinkKind, LinkedTo, Repeat};
    use chrono::{Local, TimeZone, Utc};

    #[test]
    fn format_includes_flags() {
        let reminder = Reminder {
            id: "r1".into(),
            title: "Pay rent".into(),
            message: String::new(),
            datetime: Local.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap(),
            repeat: Some(Repeat::Monthly),
            is_active: false,
            linked_to: Some(LinkedTo {
                kind: LinkKind::Task,
                id: "t1".into(),
            }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(
            format_reminder(&reminder),
            "r1  2024-02-01 09:00  Pay rent  [monthly]  (inactive)  -> task:t1"
        );
    }
}
