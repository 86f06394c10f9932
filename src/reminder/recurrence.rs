//! Next-occurrence arithmetic for recurring reminders.
//!
//! All steps are calendar steps on local wall-clock time, so a daily 09:00
//! reminder stays at 09:00 across DST changes. Monthly steps clamp to the last
//! day of a shorter month: Jan 31 → Feb 29 (leap year) → Mar 29. The clamped day
//! is carried forward; the original day-of-month is not remembered.

use chrono::{DateTime, Days, Duration, LocalResult, Months, NaiveDateTime, TimeZone};

use super::types::Repeat;

/// Upper bound on catch-up steps in [`next_after`]. Daily and weekly rules
/// jump straight to the last missed occurrence, so only monthly rules step,
/// and 10 000 months is over 800 years.
const MAX_CATCH_UP_STEPS: usize = 10_000;

impl Repeat {
    /// The occurrence one step after `at`, or `None` if the calendar runs out.
    /// The result is always strictly later than `at`.
    pub fn advance<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let naive = at.naive_local();
        let stepped = match self {
            Self::Daily => naive.checked_add_days(Days::new(1)),
            Self::Weekly => naive.checked_add_days(Days::new(7)),
            Self::Monthly => naive.checked_add_months(Months::new(1)),
        }?;

        let next = resolve_local(&at.timezone(), stepped)?;
        (next > *at).then_some(next)
    }
}

/// First occurrence strictly after `now`, starting from `at`.
///
/// Used when a recurring reminder fires late (the process was suspended, or
/// the machine slept) so that missed occurrences are skipped rather than
/// replayed back to back.
pub fn next_after<Tz: TimeZone>(repeat: Repeat, at: &DateTime<Tz>, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let start = skip_missed(repeat, at, now).unwrap_or_else(|| at.clone());
    let mut next = repeat.advance(&start)?;
    for _ in 0..MAX_CATCH_UP_STEPS {
        if next > *now {
            return Some(next);
        }
        next = repeat.advance(&next)?;
    }
    None
}

/// For fixed-length rules, the occurrence one period before the day of
/// `now`, reached in a single calendar step. `None` when there is nothing to
/// skip or the rule is monthly.
fn skip_missed<Tz: TimeZone>(repeat: Repeat, at: &DateTime<Tz>, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let period: i64 = match repeat {
        Repeat::Daily => 1,
        Repeat::Weekly => 7,
        Repeat::Monthly => return None,
    };
    let start = at.naive_local();
    let days = now.naive_local().date().signed_duration_since(start.date()).num_days();
    let steps = days / period - 1;
    if steps <= 0 {
        return None;
    }
    let skipped = start.checked_add_days(Days::new(u64::try_from(steps * period).ok()?))?;
    resolve_local(&at.timezone(), skipped)
}

/// Map a local wall-clock time back to an instant. Times in a DST gap move
/// forward one hour; ambiguous times take the earlier instant.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz.from_local_datetime(&(naive + Duration::hours(1))).earliest(),
    }
}
