//! SQLite-backed [`ReminderRepository`].
//!
//! Every write runs in a transaction together with its `reminder_log` audit
//! entry. Datetimes are stored as RFC 3339 text; `datetime` keeps the local
//! offset it was written with and is read back into the local zone.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use crate::error::{ReminderError, Result};
use crate::reminder::repository::ReminderRepository;
use crate::reminder::types::{parse_datetime, LinkKind, LinkedTo, Reminder, Repeat};

const SELECT_COLUMNS: &str = "id, title, message, datetime, repeat, is_active, linked_kind, \
                              linked_id, created_at, updated_at";

pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open the database file at `path` (schema and migrations included).
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(super::open_database(path)?))
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(super::open_memory_database()?))
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the underlying connection (diagnostics, tests).
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        f(&*self.conn())
    }
}

impl ReminderRepository for SqliteRepository {
    fn load(&self) -> Result<Vec<Reminder>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM reminders ORDER BY rowid"
        ))?;
        let reminders = stmt
            .query_map([], row_to_reminder)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reminders)
    }

    fn save(&self, reminders: &[Reminder]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM reminders", [])?;
        for reminder in reminders {
            insert_row(&tx, reminder)?;
        }
        write_audit_log(
            &tx,
            "import",
            "*",
            Some(&serde_json::json!({ "replace": true, "count": reminders.len() })),
        )?;

        tx.commit()?;
        Ok(())
    }

    fn insert(&self, reminder: &Reminder) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        insert_row(&tx, reminder)?;
        write_audit_log(&tx, "create", &reminder.id, None)?;
        tx.commit()?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Reminder>> {
        let conn = self.conn();
        let reminder = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM reminders WHERE id = ?1"),
                params![id],
                row_to_reminder,
            )
            .optional()?;
        Ok(reminder)
    }

    fn update(&self, reminder: &Reminder) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let changed = tx.execute(
            "UPDATE reminders SET title = ?2, message = ?3, datetime = ?4, repeat = ?5, \
             is_active = ?6, linked_kind = ?7, linked_id = ?8, updated_at = ?9 WHERE id = ?1",
            params![
                reminder.id,
                reminder.title,
                reminder.message,
                reminder.datetime.to_rfc3339(),
                reminder.repeat.map(|r| r.as_str()),
                reminder.is_active,
                reminder.linked_to.as_ref().map(|l| l.kind.as_str()),
                reminder.linked_to.as_ref().map(|l| l.id.as_str()),
                reminder.updated_at.to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            tracing::debug!(id = %reminder.id, "update target missing from database");
            return Ok(false);
        }

        let details = serde_json::json!({
            "datetime": reminder.datetime.to_rfc3339(),
            "is_active": reminder.is_active,
        });
        write_audit_log(&tx, "update", &reminder.id, Some(&details))?;

        tx.commit()?;
        Ok(true)
    }

    fn reschedule(&self, id: &str, datetime: DateTime<Local>, updated_at: DateTime<Utc>) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let changed = tx.execute(
            "UPDATE reminders SET datetime = ?2, updated_at = ?3 WHERE id = ?1 AND is_active = 1",
            params![id, datetime.to_rfc3339(), updated_at.to_rfc3339()],
        )?;
        if changed == 0 {
            tracing::debug!(id, "reschedule target missing or inactive");
            return Ok(false);
        }

        let details = serde_json::json!({ "datetime": datetime.to_rfc3339() });
        write_audit_log(&tx, "update", id, Some(&details))?;

        tx.commit()?;
        Ok(true)
    }

    fn remove(&self, id: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM reminders WHERE id = ?1", params![id])?;
        write_audit_log(&tx, "delete", id, None)?;
        tx.commit()?;
        Ok(())
    }

    /// `PRAGMA data_version`: changes when a different connection commits.
    fn revision(&self) -> Result<Option<i64>> {
        let version: i64 = self
            .conn()
            .query_row("PRAGMA data_version", [], |row| row.get(0))?;
        Ok(Some(version))
    }
}

fn insert_row(tx: &Transaction, reminder: &Reminder) -> Result<()> {
    tx.execute(
        "INSERT INTO reminders (id, title, message, datetime, repeat, is_active, linked_kind, \
         linked_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            reminder.id,
            reminder.title,
            reminder.message,
            reminder.datetime.to_rfc3339(),
            reminder.repeat.map(|r| r.as_str()),
            reminder.is_active,
            reminder.linked_to.as_ref().map(|l| l.kind.as_str()),
            reminder.linked_to.as_ref().map(|l| l.id.as_str()),
            reminder.created_at.to_rfc3339(),
            reminder.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Append an entry to the `reminder_log` audit table.
pub fn write_audit_log(
    tx: &Transaction,
    operation: &str,
    reminder_id: &str,
    details: Option<&serde_json::Value>,
) -> Result<()> {
    let details_json = details.map(serde_json::to_string).transpose()?;
    tx.execute(
        "INSERT INTO reminder_log (operation, reminder_id, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, reminder_id, details_json, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn row_to_reminder(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    let datetime: String = row.get(3)?;
    let repeat: Option<String> = row.get(4)?;
    let linked_kind: Option<String> = row.get(6)?;
    let linked_id: Option<String> = row.get(7)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    let linked_to = match (linked_kind, linked_id) {
        (Some(kind), Some(id)) => Some(LinkedTo {
            kind: kind.parse::<LinkKind>().map_err(|e| conversion_error(6, e))?,
            id,
        }),
        _ => None,
    };

    Ok(Reminder {
        id: row.get(0)?,
        title: row.get(1)?,
        message: row.get(2)?,
        datetime: parse_datetime(&datetime).map_err(|e| conversion_error(3, e))?,
        repeat: repeat
            .map(|r| r.parse::<Repeat>())
            .transpose()
            .map_err(|e| conversion_error(4, e))?,
        is_active: row.get(5)?,
        linked_to,
        created_at: parse_utc(&created_at).map_err(|e| conversion_error(8, e))?,
        updated_at: parse_utc(&updated_at).map_err(|e| conversion_error(9, e))?,
    })
}

fn parse_utc(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ReminderError::InvalidDateTime(raw.to_string()))
}

fn conversion_error(column: usize, err: ReminderError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn sample(id: &str) -> Reminder {
        Reminder {
            id: id.to_string(),
            title: "Pay rent".into(),
            message: "transfer before noon".into(),
            datetime: Local.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap(),
            repeat: Some(Repeat::Monthly),
            is_active: true,
            linked_to: Some(LinkedTo {
                kind: LinkKind::Task,
                id: "t-17".into(),
            }),
            created_at: Utc.with_ymd_and_hms(2023, 12, 1, 10, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2023, 12, 1, 10, 0, 0).unwrap(),
        }
    }

    fn log_ops(repo: &SqliteRepository, id: &str) -> Vec<String> {
        repo.with_connection(|conn| {
            conn.prepare("SELECT operation FROM reminder_log WHERE reminder_id = ?1 ORDER BY id")
                .unwrap()
                .query_map([id], |row| row.get(0))
                .unwrap()
                .collect::<rusqlite::Result<Vec<String>>>()
                .unwrap()
        })
    }

    #[test]
    fn insert_then_load_preserves_fields() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let r = sample("a");
        repo.insert(&r).unwrap();
        assert_eq!(repo.load().unwrap(), vec![r]);
    }

    #[test]
    fn load_keeps_insertion_order() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        for id in ["z", "a", "m"] {
            repo.insert(&sample(id)).unwrap();
        }
        let ids: Vec<String> = repo.load().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn update_and_remove_write_audit_entries() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let mut r = sample("a");
        repo.insert(&r).unwrap();

        r.is_active = false;
        r.repeat = None;
        r.linked_to = None;
        assert!(repo.update(&r).unwrap());
        assert_eq!(repo.load().unwrap(), vec![r.clone()]);

        repo.remove(&r.id).unwrap();
        assert!(repo.load().unwrap().is_empty());
        assert_eq!(log_ops(&repo, "a"), vec!["create", "update", "delete"]);
    }

    #[test]
    fn save_replaces_everything() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.insert(&sample("old")).unwrap();
        repo.save(&[sample("b"), sample("c")]).unwrap();

        let ids: Vec<String> = repo.load().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(log_ops(&repo, "*"), vec!["import"]);
    }

    #[test]
    fn update_of_missing_record_writes_nothing() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        assert!(!repo.update(&sample("ghost")).unwrap());
        assert!(repo.load().unwrap().is_empty());
        assert!(repo.get("ghost").unwrap().is_none());
        assert!(log_ops(&repo, "ghost").is_empty());
    }

    #[test]
    fn reschedule_only_touches_active_records() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let mut r = sample("a");
        repo.insert(&r).unwrap();
        let next = Local.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap();

        assert!(repo.reschedule("a", next, Utc::now()).unwrap());
        assert_eq!(repo.get("a").unwrap().unwrap().datetime, next);

        r.is_active = false;
        r.datetime = next;
        repo.update(&r).unwrap();
        let later = Local.with_ymd_and_hms(2024, 3, 29, 9, 0, 0).unwrap();
        assert!(!repo.reschedule("a", later, Utc::now()).unwrap());
        assert_eq!(repo.get("a").unwrap().unwrap().datetime, next);

        assert!(!repo.reschedule("missing", later, Utc::now()).unwrap());
    }

    #[test]
    fn revision_is_reported() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        assert!(repo.revision().unwrap().is_some());
    }
}
