pub mod permission;
pub mod surface;

pub use permission::{FixedPrompt, Permission, PermissionGate, PermissionPrompt, TerminalPrompt};
pub use surface::{CommandNotifier, Notifier, TerminalNotifier};
