//! Places a fired reminder can be shown.
//!
//! A [`Notifier`] never reports failure to the scheduler: a missing command
//! or a broken pipe is logged and the reminder simply goes unseen.

use std::process::{Command, Stdio};

pub trait Notifier: Send + Sync {
    /// Show `title`/`body`. `tag` is the reminder id, so a surface that
    /// supports replacement can collapse repeats of the same reminder.
    fn notify(&self, title: &str, body: &str, tag: &str);
}

/// Logs the notification and prints a line to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, title: &str, body: &str, tag: &str) {
        tracing::info!(tag, title, "reminder notification");
        if body.is_empty() {
            println!("\x07[reminder] {title}");
        } else {
            println!("\x07[reminder] {title}: {body}");
        }
    }
}

/// Runs an external program with the title and body appended as the last
/// two arguments, e.g. `notify-send --app-name=chime <title> <body>`.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
    args: Vec<String>,
}

impl CommandNotifier {
    /// Build from `[program, args...]`. `None` for an empty list.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn command(&self, title: &str, body: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(title)
            .arg(body)
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        cmd
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, title: &str, body: &str, tag: &str) {
        match self.command(title, body).spawn() {
            Ok(mut child) => {
                tracing::info!(tag, title, program = %self.program, pid = child.id(), "reminder notification sent");
                // Reaped off-thread; firing must not block on the child.
                std::thread::spawn(move || child.wait());
            }
            Err(e) => {
                tracing::warn!(tag, program = %self.program, error = %e, "notification command failed");
            }
        }
    }
}

/// Pick the surface described by `[notifications] command`.
pub fn from_config(config: &crate::config::NotificationConfig) -> Box<dyn Notifier> {
    match CommandNotifier::from_argv(&config.command) {
        Some(notifier) => Box::new(notifier),
        None => Box::new(TerminalNotifier),
    }
}
