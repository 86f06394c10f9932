//! `chime serve`: the long-running reminder daemon.
//!
//! Wires the database, permission gate, notifier and scheduler together,
//! rehydrates timers, then waits for Ctrl-C while watching the database for
//! commits made by other chime processes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::clock::{Clock, SystemClock};
use crate::config::{ChimeConfig, PermissionPolicy};
use crate::db::repository::SqliteRepository;
use crate::notify::{surface, FixedPrompt, Notifier, Permission, PermissionGate, PermissionPrompt, TerminalPrompt};
use crate::reminder::{ReminderRepository, ReminderStore};
use crate::service::ReminderService;

/// Build the permission gate described by `[notifications] permission`.
pub fn permission_gate(policy: PermissionPolicy) -> PermissionGate {
    let prompt: Option<Box<dyn PermissionPrompt>> = match policy {
        PermissionPolicy::Ask => TerminalPrompt::detect().map(|p| Box::new(p) as Box<dyn PermissionPrompt>),
        PermissionPolicy::Granted => Some(Box::new(FixedPrompt(Permission::Granted))),
        PermissionPolicy::Denied => Some(Box::new(FixedPrompt(Permission::Denied))),
    };
    PermissionGate::new(prompt)
}

/// Open storage and build the service. Shared by the daemon and tests.
pub fn setup_service(config: &ChimeConfig) -> Result<(Arc<ReminderService>, Arc<SqliteRepository>)> {
    let db_path = config.resolved_db_path();
    let repo = Arc::new(SqliteRepository::open(&db_path)?);
    tracing::info!(db = %db_path.display(), "database ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(
        ReminderStore::open(repo.clone(), Arc::clone(&clock)).context("failed to load reminders")?,
    );

    let gate = Arc::new(permission_gate(config.notifications.permission));
    let notifier: Arc<dyn Notifier> = Arc::from(surface::from_config(&config.notifications));

    let service = Arc::new(ReminderService::new(store, gate, notifier, clock));
    Ok((service, repo))
}

/// Run the daemon until Ctrl-C.
pub async fn serve(config: ChimeConfig) -> Result<()> {
    tracing::info!("starting chime reminder daemon");

    let (service, repo) = setup_service(&config)?;

    // Ask once, before anything is armed.
    let gate = service.scheduler().gate();
    if gate.state() == Permission::Default {
        let gate = Arc::clone(&gate);
        tokio::task::spawn_blocking(move || gate.request_permission())
            .await
            .context("permission prompt task failed")?;
    }
    if let Err(e) = gate.require_granted() {
        tracing::warn!(error = %e, permission = %gate.state(), "reminders will not be shown");
    }

    service.rehydrate();

    let result = watch(&service, repo.as_ref(), config.scheduler.sync_interval_secs).await;

    service.shutdown();
    tracing::info!("chime daemon shut down");
    result
}

/// Wait for Ctrl-C, resyncing whenever another connection has committed.
async fn watch(service: &Arc<ReminderService>, repo: &dyn ReminderRepository, interval_secs: u64) -> Result<()> {
    if interval_secs == 0 {
        tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
        return Ok(());
    }

    let mut last_revision = repo.revision()?;
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                tracing::info!("interrupt received");
                return Ok(());
            }
            _ = ticker.tick() => {
                match repo.revision() {
                    Ok(revision) if revision != last_revision => {
                        tracing::debug!(?last_revision, ?revision, "database changed externally");
                        last_revision = revision;
                        let service = Arc::clone(service);
                        match tokio::task::spawn_blocking(move || service.resync()).await {
                            Ok(Ok(_)) => {}
                            Ok(Err(e)) => tracing::error!(error = %e, "resync failed"),
                            Err(e) => tracing::error!(error = %e, "resync task failed"),
                        }
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "failed to read database revision"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policies_resolve_without_asking() {
        let gate = permission_gate(PermissionPolicy::Granted);
        assert_eq!(gate.state(), Permission::Default);
        assert_eq!(gate.request_permission(), Permission::Granted);
        assert!(gate.is_granted());

        let gate = permission_gate(PermissionPolicy::Denied);
        assert_eq!(gate.request_permission(), Permission::Denied);
        assert!(!gate.is_granted());
    }

    #[test]
    fn setup_service_loads_existing_reminders() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ChimeConfig::default();
        config.storage.db_path = dir.path().join("chime.db").display().to_string();

        let (service, _) = setup_service(&config).unwrap();
        assert!(service.all().is_empty());
        let created = service
            .store()
            .create(crate::reminder::NewReminder {
                title: Some("Persisted".into()),
                datetime: Some(chrono::Local::now() + chrono::Duration::hours(1)),
                ..Default::default()
            })
            .unwrap();
        drop(service);

        let (service, repo) = setup_service(&config).unwrap();
        assert_eq!(service.get(&created.id).unwrap().title, "Persisted");
        assert!(repo.revision().unwrap().is_some());
    }
}
