//! CLI `add`, `update`, `toggle` and `delete` commands.

use anyhow::Result;

use crate::config::ChimeConfig;
use crate::error::ReminderError;
use crate::reminder::{parse_datetime, LinkedTo, NewReminder, ReminderPatch, Repeat};

use super::{format_reminder, open_store};

/// Arguments for `chime add`.
#[derive(Debug, Clone, Default)]
pub struct AddArgs {
    pub title: String,
    pub at: String,
    pub message: Option<String>,
    pub repeat: Option<String>,
    pub link: Option<String>,
}

/// Arguments for `chime update`.
#[derive(Debug, Clone, Default)]
pub struct UpdateArgs {
    pub title: Option<String>,
    pub message: Option<String>,
    pub at: Option<String>,
    pub repeat: Option<String>,
}

impl AddArgs {
    pub fn into_new_reminder(self) -> Result<NewReminder, ReminderError> {
        Ok(NewReminder {
            title: Some(self.title),
            message: self.message,
            datetime: Some(parse_datetime(&self.at)?),
            repeat: self
                .repeat
                .as_deref()
                .map(Repeat::parse_optional)
                .transpose()?
                .flatten(),
            is_active: None,
            linked_to: self.link.as_deref().map(str::parse::<LinkedTo>).transpose()?,
        })
    }
}

impl UpdateArgs {
    pub fn into_patch(self) -> Result<ReminderPatch, ReminderError> {
        Ok(ReminderPatch {
            title: self.title,
            message: self.message,
            datetime: self.at.as_deref().map(parse_datetime).transpose()?,
            repeat: self
                .repeat
                .as_deref()
                .map(Repeat::parse_optional)
                .transpose()?,
            ..ReminderPatch::default()
        })
    }
}

pub fn add(config: &ChimeConfig, args: AddArgs) -> Result<()> {
    let store = open_store(config)?;
    let reminder = store.create(args.into_new_reminder()?)?;
    println!("Added {}", format_reminder(&reminder));
    Ok(())
}

pub fn update(config: &ChimeConfig, id: &str, args: UpdateArgs) -> Result<()> {
    let patch = args.into_patch()?;
    anyhow::ensure!(!patch.is_empty(), "nothing to update: pass at least one field");

    let store = open_store(config)?;
    let reminder = store
        .update(id, patch)?
        .ok_or_else(|| ReminderError::NotFound(id.to_string()))?;
    println!("Updated {}", format_reminder(&reminder));
    Ok(())
}

pub fn toggle(config: &ChimeConfig, id: &str) -> Result<()> {
    let store = open_store(config)?;
    let reminder = store
        .toggle_active(id)?
        .ok_or_else(|| ReminderError::NotFound(id.to_string()))?;
    let state = if reminder.is_active { "activated" } else { "deactivated" };
    println!("Reminder {id} {state}");
    Ok(())
}

pub fn delete(config: &ChimeConfig, id: &str) -> Result<()> {
    let store = open_store(config)?;
    if !store.delete(id)? {
        return Err(ReminderError::NotFound(id.to_string()).into());
    }
    println!("Deleted reminder {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::LinkKind;

    #[test]
    fn add_args_parse_into_new_reminder() {
        let new = AddArgs {
            title: "Pay rent".into(),
            at: "2024-02-01T09:00".into(),
            message: Some("before noon".into()),
            repeat: Some("monthly".into()),
            link: Some("task:t1".into()),
        }
        .into_new_reminder()
        .unwrap();

        assert_eq!(new.title.as_deref(), Some("Pay rent"));
        assert_eq!(new.repeat, Some(Repeat::Monthly));
        assert_eq!(new.linked_to.unwrap().kind, LinkKind::Task);
        assert!(new.datetime.is_some());
    }

    #[test]
    fn add_args_reject_bad_datetime() {
        let err = AddArgs {
            title: "x".into(),
            at: "next tuesday".into(),
            ..Default::default()
        }
        .into_new_reminder()
        .unwrap_err();
        assert!(matches!(err, ReminderError::InvalidDateTime(_)));
    }

    #[test]
    fn update_args_can_clear_repeat() {
        let patch = UpdateArgs {
            repeat: Some("none".into()),
            ..Default::default()
        }
        .into_patch()
        .unwrap();
        assert_eq!(patch.repeat, Some(None));
        assert!(patch.touches_schedule());
    }
}
