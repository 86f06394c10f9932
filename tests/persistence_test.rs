mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chime::db::repository::SqliteRepository;
use chime::notify::Permission;
use chime::reminder::{ReminderPatch, ReminderRepository, Repeat};
use chime::ReminderError;
use helpers::{harness_with_repo, local, new_reminder};

#[tokio::test(start_paused = true)]
async fn reminders_survive_a_restart_and_are_rearmed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chime.db");
    let now = local(2024, 1, 1, 8, 0);

    let id = {
        let repo = Arc::new(SqliteRepository::open(&path).unwrap());
        let h = harness_with_repo(repo, now, Permission::Granted);
        let r = h
            .service
            .create(new_reminder("Stretch", local(2024, 1, 1, 9, 0), Some(Repeat::Daily)))
            .unwrap();
        h.service
            .update(
                &r.id,
                ReminderPatch {
                    message: Some("Two minutes".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        h.service.shutdown();
        r.id
    };

    // Fresh process: nothing is armed until rehydration.
    let repo = Arc::new(SqliteRepository::open(&path).unwrap());
    let h = harness_with_repo(repo, now, Permission::Granted);
    let loaded = h.service.get(&id).unwrap();
    assert_eq!(loaded.title, "Stretch");
    assert_eq!(loaded.message, "Two minutes");
    assert_eq!(loaded.repeat, Some(Repeat::Daily));
    assert_eq!(loaded.datetime, local(2024, 1, 1, 9, 0));
    assert_eq!(h.service.scheduler().pending_count(), 0);

    assert_eq!(h.service.rehydrate(), 1);
    tokio::time::sleep(Duration::from_secs(3601)).await;
    assert_eq!(h.notifier.count(), 1);

    let reopened = SqliteRepository::open(&path).unwrap();
    assert_eq!(reopened.load().unwrap()[0].datetime, local(2024, 1, 2, 9, 0));
}

#[tokio::test(start_paused = true)]
async fn second_connection_changes_are_detected_and_resynced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chime.db");

    let daemon_repo = Arc::new(SqliteRepository::open(&path).unwrap());
    let h = harness_with_repo(daemon_repo.clone(), local(2024, 1, 1, 8, 0), Permission::Granted);
    h.service.rehydrate();
    let before = daemon_repo.revision().unwrap();

    // A CLI invocation adds a reminder through its own connection.
    let cli_repo = Arc::new(SqliteRepository::open(&path).unwrap());
    let cli = harness_with_repo(cli_repo, local(2024, 1, 1, 8, 0), Permission::Granted);
    let added = cli
        .service
        .store()
        .create(new_reminder("From the CLI", local(2024, 1, 1, 10, 0), None))
        .unwrap();

    assert_ne!(daemon_repo.revision().unwrap(), before);
    assert!(h.service.get(&added.id).is_none());

    assert_eq!(h.service.resync().unwrap(), 1);
    assert!(h.service.scheduler().is_armed(&added.id));

    tokio::time::sleep(Duration::from_secs(2 * 3600 + 1)).await;
    assert_eq!(h.notifier.sent()[0].title, "From the CLI");
}

#[test]
fn create_without_datetime_is_rejected_and_nothing_is_written() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let h = harness_with_repo(repo.clone(), local(2024, 1, 1, 8, 0), Permission::Granted);

    let err = h
        .service
        .store()
        .create(chime::reminder::NewReminder {
            title: Some("No time".into()),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, ReminderError::InvalidDateTime(_)));
    assert!(repo.load().unwrap().is_empty());
}

#[test]
fn browser_state_export_imports_into_sqlite() {
    let json = r#"{
        "state": {
            "reminders": [
                {
                    "id": "r-1",
                    "title": "Pay rent",
                    "message": "",
                    "datetime": "2024-01-15T09:00:00+00:00",
                    "repeat": "monthly",
                    "isActive": true,
                    "linkedTo": { "type": "task", "id": "t-9" },
                    "createdAt": "2024-01-01T00:00:00Z",
                    "updatedAt": "2024-01-01T00:00:00Z"
                }
            ]
        },
        "version": 0
    }"#;
    let records = chime::cli::import::parse_import(json).unwrap();
    assert_eq!(records.len(), 1);

    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let h = harness_with_repo(repo.clone(), local(2024, 1, 1, 8, 0), Permission::Granted);
    let summary = h.service.store().import(records.clone(), false).unwrap();
    assert_eq!(summary.imported, 1);

    let again = h.service.store().import(records, false).unwrap();
    assert_eq!(again.imported, 0);
    assert_eq!(again.skipped, 1);

    let stored = &repo.load().unwrap()[0];
    assert_eq!(stored.repeat, Some(Repeat::Monthly));
    assert_eq!(stored.linked_to.as_ref().unwrap().id, "t-9");
}

#[tokio::test(start_paused = true)]
async fn delete_from_another_connection_is_not_undone_by_firing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chime.db");

    let daemon_repo = Arc::new(SqliteRepository::open(&path).unwrap());
    let h = harness_with_repo(daemon_repo, local(2024, 1, 1, 8, 0), Permission::Granted);
    let r = h
        .service
        .create(new_reminder("Standup", local(2024, 1, 1, 9, 0), Some(Repeat::Daily)))
        .unwrap();

    // `chime delete` runs before the daemon has polled for changes.
    let cli_repo = SqliteRepository::open(&path).unwrap();
    cli_repo.remove(&r.id).unwrap();

    tokio::time::sleep(Duration::from_secs(3601)).await;
    assert_eq!(h.notifier.count(), 0);
    assert!(cli_repo.load().unwrap().is_empty());
    assert!(h.service.get(&r.id).is_none());
    assert!(!h.service.scheduler().is_armed(&r.id));
}

#[tokio::test(start_paused = true)]
async fn deactivation_from_another_connection_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chime.db");

    let daemon_repo = Arc::new(SqliteRepository::open(&path).unwrap());
    let h = harness_with_repo(daemon_repo, local(2024, 1, 1, 8, 0), Permission::Granted);
    let r = h
        .service
        .create(new_reminder("Standup", local(2024, 1, 1, 9, 0), Some(Repeat::Daily)))
        .unwrap();

    // `chime toggle` through its own store and connection.
    let cli_repo = Arc::new(SqliteRepository::open(&path).unwrap());
    let cli = harness_with_repo(cli_repo.clone(), local(2024, 1, 1, 8, 0), Permission::Granted);
    let toggled = cli.service.store().toggle_active(&r.id).unwrap().unwrap();
    assert!(!toggled.is_active);

    tokio::time::sleep(Duration::from_secs(3601)).await;
    assert_eq!(h.notifier.count(), 0);

    let stored = cli_repo.load().unwrap();
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].is_active);
    assert_eq!(stored[0].datetime, local(2024, 1, 1, 9, 0));
    assert!(!h.service.get(&r.id).unwrap().is_active);
    assert!(!h.service.scheduler().is_armed(&r.id));
}
