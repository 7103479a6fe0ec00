//! Daily reset of repeating tasks.
//!
//! A repeating task that was checked off becomes due again at the first
//! occurrence of its `resetTime` (midnight when unset) strictly after its
//! `doneDate`. All wall-clock times are UTC.

use crate::model::Task;
use chrono::{DateTime, Days, NaiveTime, Utc};

/// Format of `resetTime`.
pub const RESET_TIME_FORMAT: &str = "%H:%M";

pub fn parse_reset_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), RESET_TIME_FORMAT).ok()
}

/// The instant a task checked off at `done_date` resets.
pub fn reset_instant(done_date: DateTime<Utc>, reset_time: Option<&str>) -> DateTime<Utc> {
    let time = reset_time
        .and_then(parse_reset_time)
        .unwrap_or(NaiveTime::MIN);
    let same_day = done_date.date_naive().and_time(time).and_utc();
    if same_day > done_date {
        return same_day;
    }
    same_day
        .checked_add_days(Days::new(1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Whether `task` should be un-checked at `now`.
pub fn needs_reset(task: &Task, now: DateTime<Utc>) -> bool {
    if !task.repeating || !task.done {
        return false;
    }
    match task.done_date {
        Some(done_date) => reset_instant(done_date, task.reset_time.as_deref()) <= now,
        // Checked off without a timestamp: nothing tells us it is still fresh.
        None => true,
    }
}
