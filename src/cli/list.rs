//! CLI `list`, `upcoming` and `today` commands.

use anyhow::Result;

use crate::config::ChimeConfig;
use crate::reminder::Reminder;

use super::{format_reminder, open_store};

/// Which slice of the collection to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    All,
    Upcoming(usize),
    Today,
}

pub fn list(config: &ChimeConfig, listing: Listing) -> Result<()> {
    let store = open_store(config)?;
    let reminders = match listing {
        Listing::All => store.all(),
        Listing::Upcoming(limit) => store.upcoming(limit),
        Listing::Today => store.today(),
    };
    print_reminders(&reminders, listing);
    Ok(())
}

fn print_reminders(reminders: &[Reminder], listing: Listing) {
    if reminders.is_empty() {
        let what = match listing {
            Listing::All => "No reminders.",
            Listing::Upcoming(_) => "No upcoming reminders.",
            Listing::Today => "Nothing due today.",
        };
        println!("{what}");
        return;
    }

    for reminder in reminders {
        println!("{}", format_reminder(reminder));
        if !reminder.message.is_empty() {
            println!("    {}", reminder.message);
        }
    }
}
