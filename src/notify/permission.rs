//! Process-wide notification permission.
//!
//! [`PermissionGate`] caches the last answer obtained from a
//! [`PermissionPrompt`]. The scheduler reads the cached state on every arm
//! and fire; only [`PermissionGate::request_permission`] ever prompts.

use std::io::{BufRead, IsTerminal, Write};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{ReminderError, Result};

/// Cached permission state. `Default` means nobody has been asked yet, or the
/// question was dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    #[default]
    Default,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Default => "default",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can ask whether notifications may be shown.
pub trait PermissionPrompt: Send + Sync {
    fn request(&self) -> Permission;
}

/// Answers with a preconfigured decision.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt(pub Permission);

impl PermissionPrompt for FixedPrompt {
    fn request(&self) -> Permission {
        self.0
    }
}

/// Asks on the controlling terminal: `y`/`yes` grants, `n`/`no` denies,
/// anything else (including EOF) leaves the state at `default`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    /// `Some` only when stdin is an interactive terminal.
    pub fn detect() -> Option<Self> {
        std::io::stdin().is_terminal().then_some(Self)
    }

    fn interpret(answer: &str) -> Permission {
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Permission::Granted,
            "n" | "no" => Permission::Denied,
            _ => Permission::Default,
        }
    }
}

impl PermissionPrompt for TerminalPrompt {
    fn request(&self) -> Permission {
        print!("Allow chime to show reminder notifications? [y/N] ");
        if std::io::stdout().flush().is_err() {
            return Permission::Default;
        }

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => Permission::Default,
            Ok(_) => Self::interpret(&answer),
        }
    }
}

pub struct PermissionGate {
    state: RwLock<Permission>,
    prompt: Option<Box<dyn PermissionPrompt>>,
}

impl PermissionGate {
    /// A gate that can prompt through `prompt`, or never prompts when `None`
    /// (no notification capability in this environment).
    pub fn new(prompt: Option<Box<dyn PermissionPrompt>>) -> Self {
        Self {
            state: RwLock::new(Permission::Default),
            prompt,
        }
    }

    /// A gate already holding `state`. Mostly for tests.
    pub fn with_state(state: Permission) -> Self {
        Self {
            state: RwLock::new(state),
            prompt: None,
        }
    }

    pub fn state(&self) -> Permission {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_granted(&self) -> bool {
        self.state() == Permission::Granted
    }

    /// `Ok` only when notifications may be shown.
    pub fn require_granted(&self) -> Result<()> {
        if self.is_granted() {
            Ok(())
        } else {
            Err(ReminderError::PermissionDenied)
        }
    }

    /// Prompt once and cache the answer.
    ///
    /// Without a prompt capability this returns `Denied` and leaves the
    /// cached state alone.
    pub fn request_permission(&self) -> Permission {
        let Some(prompt) = &self.prompt else {
            tracing::debug!("no notification capability, permission denied without prompting");
            return Permission::Denied;
        };

        let answer = prompt.request();
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = answer;
        tracing::info!(permission = %answer, "notification permission updated");
        answer
    }
}
