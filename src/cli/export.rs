use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::ChimeConfig;
use crate::reminder::Reminder;

/// Export format: every reminder, storage fields camelCased.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub version: u32,
    pub reminders: Vec<Reminder>,
}

pub const EXPORT_VERSION: u32 = 1;

/// Export all reminders as JSON to stdout.
pub fn export(config: &ChimeConfig) -> Result<()> {
    let store = super::open_store(config)?;
    let data = ExportData {
        version: EXPORT_VERSION,
        reminders: store.all(),
    };

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    eprintln!("Exported {} reminders.", data.reminders.len());
    Ok(())
}
