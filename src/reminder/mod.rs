pub mod recurrence;
pub mod repository;
pub mod store;
pub mod types;

pub use repository::{MemoryRepository, ReminderRepository};
pub use store::{ImportSummary, ReminderStore};
pub use types::{parse_datetime, LinkKind, LinkedTo, NewReminder, Reminder, ReminderPatch, Repeat};
