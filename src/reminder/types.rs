//! Reminder record and its input shapes.
//!
//! Defines [`Reminder`] (a stored record), [`Repeat`] (recurrence rule),
//! [`LinkedTo`] (an opaque back-reference into tasks, notes or goals), and the
//! [`NewReminder`] / [`ReminderPatch`] inputs accepted by the store.
//!
//! Serialized field names are camelCase so exports line up with the browser
//! storage format reminders were first kept in.

use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReminderError, Result};

/// Recurrence rule applied after a reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    Daily,
    Weekly,
    Monthly,
}

impl Repeat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Parse a repeat rule where `"none"` (or empty) means no recurrence.
    pub fn parse_optional(s: &str) -> Result<Option<Self>> {
        match s.trim() {
            "" | "none" => Ok(None),
            other => other.parse().map(Some),
        }
    }
}

impl std::fmt::Display for Repeat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Repeat {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(ReminderError::InvalidInput(format!("unknown repeat rule: {s}"))),
        }
    }
}

/// What kind of record a reminder points back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Task,
    Note,
    Goal,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Note => "note",
            Self::Goal => "goal",
        }
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LinkKind {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "task" => Ok(Self::Task),
            "note" => Ok(Self::Note),
            "goal" => Ok(Self::Goal),
            _ => Err(ReminderError::InvalidInput(format!("unknown link kind: {s}"))),
        }
    }
}

/// Back-reference to a task, note or goal. Never dereferenced here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedTo {
    #[serde(rename = "type")]
    pub kind: LinkKind,
    pub id: String,
}

impl std::str::FromStr for LinkedTo {
    type Err = ReminderError;

    /// Parses `kind:id`, e.g. `task:42`.
    fn from_str(s: &str) -> Result<Self> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| ReminderError::InvalidInput(format!("expected kind:id, got {s}")))?;
        if id.is_empty() {
            return Err(ReminderError::InvalidInput(format!("empty link id in {s}")));
        }
        Ok(Self {
            kind: kind.parse()?,
            id: id.to_string(),
        })
    }
}

/// A reminder record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// UUID v7, assigned at creation.
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    /// Next instant this reminder is due.
    #[serde(with = "local_datetime")]
    pub datetime: DateTime<Local>,
    /// `None` for one-shot reminders.
    #[serde(default)]
    pub repeat: Option<Repeat>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub linked_to: Option<LinkedTo>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// Input for [`crate::reminder::store::ReminderStore::create`].
///
/// Every field is optional so partial input can be validated in one place;
/// a missing `datetime` is rejected.
#[derive(Debug, Clone, Default)]
pub struct NewReminder {
    pub title: Option<String>,
    pub message: Option<String>,
    pub datetime: Option<DateTime<Local>>,
    pub repeat: Option<Repeat>,
    pub is_active: Option<bool>,
    pub linked_to: Option<LinkedTo>,
}

/// Partial update. Outer `None` leaves a field untouched; for `repeat` and
/// `linked_to`, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ReminderPatch {
    pub title: Option<String>,
    pub message: Option<String>,
    pub datetime: Option<DateTime<Local>>,
    pub repeat: Option<Option<Repeat>>,
    pub is_active: Option<bool>,
    pub linked_to: Option<Option<LinkedTo>>,
}

impl ReminderPatch {
    pub fn reschedule(datetime: DateTime<Local>) -> Self {
        Self {
            datetime: Some(datetime),
            ..Self::default()
        }
    }

    /// Whether applying this patch changes when (or whether) the reminder fires.
    pub fn touches_schedule(&self) -> bool {
        self.datetime.is_some() || self.repeat.is_some() || self.is_active.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.touches_schedule()
            && self.title.is_none()
            && self.message.is_none()
            && self.linked_to.is_none()
    }

    pub(crate) fn apply(self, reminder: &mut Reminder) {
        if let Some(title) = self.title {
            reminder.title = title;
        }
        if let Some(message) = self.message {
            reminder.message = message;
        }
        if let Some(datetime) = self.datetime {
            reminder.datetime = datetime;
        }
        if let Some(repeat) = self.repeat {
            reminder.repeat = repeat;
        }
        if let Some(is_active) = self.is_active {
            reminder.is_active = is_active;
        }
        if let Some(linked_to) = self.linked_to {
            reminder.linked_to = linked_to;
        }
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a user- or storage-supplied datetime.
///
/// Accepts RFC 3339 with an offset, or a naive `YYYY-MM-DDTHH:MM[:SS]` value
/// read as local wall-clock time. A naive time that falls in a DST gap does
/// not exist locally and is rejected; an ambiguous one takes the earlier instant.
pub fn parse_datetime(input: &str) -> Result<DateTime<Local>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ReminderError::InvalidDateTime(input.to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Local));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return match Local.from_local_datetime(&naive) {
                LocalResult::Single(dt) => Ok(dt),
                LocalResult::Ambiguous(earliest, _) => Ok(earliest),
                LocalResult::None => Err(ReminderError::InvalidDateTime(input.to_string())),
            };
        }
    }

    Err(ReminderError::InvalidDateTime(input.to_string()))
}

/// Serde adapter: writes RFC 3339 with the local offset, reads anything
/// [`parse_datetime`] accepts.
pub(crate) mod local_datetime {
    use chrono::{DateTime, Local};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Local>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_datetime(&raw).map_err(serde::de::Error::custom)
    }
}
