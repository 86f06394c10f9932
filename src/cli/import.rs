//! CLI `import` command.
//!
//! Accepts either a `chime export` document or the browser storage snapshot
//! (`{"state": {"reminders": [...]}, "version": 0}`) reminders used to live in.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::config::ChimeConfig;
use crate::reminder::Reminder;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportDocument {
    Export { reminders: Vec<Reminder> },
    BrowserState { state: BrowserState },
    Bare(Vec<Reminder>),
}

#[derive(Debug, Deserialize)]
struct BrowserState {
    #[serde(default)]
    reminders: Vec<Reminder>,
}

/// Parse any accepted import document into reminder records.
pub fn parse_import(json: &str) -> Result<Vec<Reminder>> {
    let doc: ImportDocument =
        serde_json::from_str(json).context("unrecognized import format")?;
    Ok(match doc {
        ImportDocument::Export { reminders } => reminders,
        ImportDocument::BrowserState { state } => state.reminders,
        ImportDocument::Bare(reminders) => reminders,
    })
}

/// Import reminders from a JSON file. Existing ids are skipped unless `replace`.
pub fn import(config: &ChimeConfig, path: &Path, replace: bool) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let reminders = parse_import(&contents)?;

    let store = super::open_store(config)?;
    let summary = store.import(reminders, replace)?;

    println!(
        "Imported {} reminders ({} skipped).",
        summary.imported, summary.skipped
    );
    Ok(())
}
