//! Weekday-based window entry.
//!
//! The picker lets a user choose a start weekday/hour/minute and an end
//! weekday/hour/minute. A draft is turned into a concrete [`TimeWindow`]
//! by placing those weekdays on the calendar of the upcoming week.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::TimeWindow;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDraft {
    pub start_day: Weekday,
    pub start_hour: u32,
    pub start_minute: u32,
    pub end_day: Weekday,
    pub end_hour: u32,
    pub end_minute: u32,
    pub repeat_weekly: bool,
}

impl WindowDraft {
    /// Place the draft on the calendar relative to `now` (local civil time).
    ///
    /// The start lands on the next occurrence of `start_day`, today included.
    /// The end lands on the first `end_day` at or after the start date. A
    /// one-shot draft whose end would already be over is moved a week ahead.
    ///
    /// # Errors
    ///
    /// Returns a validation error for out-of-range hours/minutes, or when the
    /// end is not after the start (same weekday, end time not later).
    pub fn resolve(&self, now: NaiveDateTime) -> Result<TimeWindow, ValidationError> {
        let start_time = time_of_day("start", self.start_hour, self.start_minute)?;
        let end_time = time_of_day("end", self.end_hour, self.end_minute)?;

        let start_date = upcoming(now.date(), self.start_day);
        let end_date = start_date + Duration::days(days_between(self.start_day, self.end_day));

        let mut start = start_date.and_time(start_time);
        let mut end = end_date.and_time(end_time);
        if end <= start {
            return Err(ValidationError::InvalidWindow { start, end });
        }
        if !self.repeat_weekly && end <= now {
            start += Duration::weeks(1);
            end += Duration::weeks(1);
        }
        TimeWindow::from_naive(start, end, self.repeat_weekly)
    }
}

fn time_of_day(which: &str, hour: u32, minute: u32) -> Result<NaiveTime, ValidationError> {
    if hour > 23 {
        return Err(ValidationError::invalid_value(
            &format!("{which}_hour"),
            format!("{hour} is outside 0..=23"),
        ));
    }
    if minute > 59 {
        return Err(ValidationError::invalid_value(
            &format!("{which}_minute"),
            format!("{minute} is outside 0..=59"),
        ));
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| ValidationError::invalid_value(&format!("{which}_hour"), "time out of range"))
}

/// Days forward from `from` to the next `to`, 0..=6.
fn days_between(from: Weekday, to: Weekday) -> i64 {
    let from = from.num_days_from_monday() as i64;
    let to = to.num_days_from_monday() as i64;
    (to - from).rem_euclid(7)
}

fn upcoming(today: NaiveDate, day: Weekday) -> NaiveDate {
    today + Duration::days(days_between(today.weekday(), day))
}
