use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ChimeConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// How the daemon obtains notification permission at startup.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PermissionPolicy {
    /// Ask on the terminal; without a terminal there is nobody to ask.
    Ask,
    Granted,
    Denied,
}

impl std::str::FromStr for PermissionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ask" => Ok(Self::Ask),
            "granted" => Ok(Self::Granted),
            "denied" => Ok(Self::Denied),
            _ => Err(format!("unknown permission policy: {s}")),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotificationConfig {
    pub permission: PermissionPolicy,
    /// External notifier argv, e.g. `["notify-send", "--app-name=chime"]`.
    /// Empty prints to the terminal.
    pub command: Vec<String>,
    pub upcoming_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How often the daemon checks the database for changes made by other
    /// processes. 0 disables the check.
    pub sync_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_chime_dir()
            .join("reminders.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            permission: PermissionPolicy::Ask,
            command: Vec::new(),
            upcoming_limit: 5,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: 15,
        }
    }
}

/// Returns `~/.chime/`, or `./.chime/` when there is no home directory.
pub fn default_chime_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chime")
}

/// Returns the default config file path: `~/.chime/config.toml`
pub fn default_config_path() -> PathBuf {
    default_chime_dir().join("config.toml")
}

impl ChimeConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ChimeConfig::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides (CHIME_DB, CHIME_LOG_LEVEL, CHIME_PERMISSION).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("CHIME_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("CHIME_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("CHIME_PERMISSION") {
            self.notifications.permission = val
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("invalid CHIME_PERMISSION")?;
        }
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ChimeConfig::default();
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.notifications.permission, PermissionPolicy::Ask);
        assert!(config.notifications.command.is_empty());
        assert_eq!(config.notifications.upcoming_limit, 5);
        assert_eq!(config.scheduler.sync_interval_secs, 15);
        assert!(config.storage.db_path.ends_with("reminders.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[notifications]
permission = "granted"
command = ["notify-send", "--app-name=chime"]
"#;
        let config: ChimeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.notifications.permission, PermissionPolicy::Granted);
        assert_eq!(config.notifications.command, vec!["notify-send", "--app-name=chime"]);
        // defaults still apply for unset fields
        assert_eq!(config.notifications.upcoming_limit, 5);
        assert_eq!(config.scheduler.sync_interval_secs, 15);
    }

    #[test]
    fn rejects_unknown_permission_policy() {
        let toml_str = r#"
[notifications]
permission = "sometimes"
"#;
        assert!(toml::from_str::<ChimeConfig>(toml_str).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = ChimeConfig::default();
        std::env::set_var("CHIME_DB", "/tmp/override.db");
        std::env::set_var("CHIME_LOG_LEVEL", "trace");
        std::env::set_var("CHIME_PERMISSION", "denied");

        config.apply_env_overrides().unwrap();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.server.log_level, "trace");
        assert_eq!(config.notifications.permission, PermissionPolicy::Denied);

        // Clean up
        std::env::remove_var("CHIME_DB");
        std::env::remove_var("CHIME_LOG_LEVEL");
        std::env::remove_var("CHIME_PERMISSION");
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/x/reminders.db"), home.join("x/reminders.db"));
        }
        assert_eq!(expand_tilde("/abs/path.db"), PathBuf::from("/abs/path.db"));
    }
}
