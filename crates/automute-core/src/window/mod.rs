//! Mute windows.
//!
//! A [`TimeWindow`] is a start/end pair of civil (wall-clock) timestamps with
//! an optional weekly-repeat flag. The stored fields always describe one
//! literal occurrence; weekly repetition is applied at resolution time by
//! [`resolve`].
//!
//! Windows are only ever built through validating constructors, including
//! when they are read back from disk, so every `TimeWindow` in memory
//! satisfies `start < end`.

mod draft;
mod resolve;

pub use draft::WindowDraft;
pub use resolve::{resolve, to_instant, ResolvedOccurrence, SECONDS_PER_WEEK};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Unique identifier for a mute window.
pub type WindowId = String;

/// A civil calendar timestamp with minute precision, in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CivilTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl CivilTime {
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
        }
    }

    /// Validate the fields and build a naive timestamp.
    ///
    /// `which` prefixes the field name in errors ("start" or "end").
    pub fn to_naive(&self, which: &str) -> Result<NaiveDateTime, ValidationError> {
        if self.hour > 23 {
            return Err(ValidationError::invalid_value(
                &format!("{which}_hour"),
                format!("{} is outside 0..=23", self.hour),
            ));
        }
        if self.minute > 59 {
            return Err(ValidationError::invalid_value(
                &format!("{which}_minute"),
                format!("{} is outside 0..=59", self.minute),
            ));
        }
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day).ok_or_else(|| {
            ValidationError::invalid_value(
                &format!("{which}_day"),
                format!(
                    "{:04}-{:02}-{:02} is not a calendar date",
                    self.year, self.month, self.day
                ),
            )
        })?;
        date.and_hms_opt(self.hour, self.minute, 0).ok_or_else(|| {
            ValidationError::invalid_value(&format!("{which}_hour"), "time out of range")
        })
    }
}

impl From<NaiveDateTime> for CivilTime {
    fn from(t: NaiveDateTime) -> Self {
        Self {
            year: t.year(),
            month: t.month(),
            day: t.day(),
            hour: t.hour(),
            minute: t.minute(),
        }
    }
}

/// A scheduled interval during which audio should be muted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowRecord", into = "WindowRecord")]
pub struct TimeWindow {
    id: WindowId,
    start: NaiveDateTime,
    end: NaiveDateTime,
    repeat_weekly: bool,
}

impl TimeWindow {
    /// Create a window from civil start/end fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidValue`] for out-of-range fields and
    /// [`ValidationError::InvalidWindow`] when the end is not after the start.
    pub fn new(
        start: CivilTime,
        end: CivilTime,
        repeat_weekly: bool,
    ) -> Result<Self, ValidationError> {
        let start = start.to_naive("start")?;
        let end = end.to_naive("end")?;
        Self::from_naive(start, end, repeat_weekly)
    }

    /// Create a window from naive timestamps. Seconds are truncated.
    pub fn from_naive(
        start: NaiveDateTime,
        end: NaiveDateTime,
        repeat_weekly: bool,
    ) -> Result<Self, ValidationError> {
        let start = truncate_to_minute(start);
        let end = truncate_to_minute(end);
        if end <= start {
            return Err(ValidationError::InvalidWindow { start, end });
        }
        Ok(Self {
            id: new_window_id(),
            start,
            end,
            repeat_weekly,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Literal civil start, as stored.
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Literal civil end, as stored.
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn repeat_weekly(&self) -> bool {
        self.repeat_weekly
    }

    /// Civil length of the literal occurrence.
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    /// A one-shot window whose literal end is at or before `now` will never
    /// fire again. Repeating windows never expire.
    pub fn has_expired<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        !self.repeat_weekly && to_instant(&now.timezone(), self.end) <= *now
    }

    pub(crate) fn with_id(mut self, id: WindowId) -> Self {
        self.id = id;
        self
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.repeat_weekly {
            write!(
                f,
                "{} -> {} (weekly)",
                self.start.format("%a %H:%M"),
                self.end.format("%a %H:%M")
            )
        } else {
            write!(
                f,
                "{} -> {} (once)",
                self.start.format("%a %Y-%m-%d %H:%M"),
                self.end.format("%a %Y-%m-%d %H:%M")
            )
        }
    }
}

pub(crate) fn new_window_id() -> WindowId {
    uuid::Uuid::new_v4().to_string()
}

fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Flat on-disk shape of a window: ten civil integer fields plus the flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WindowRecord {
    id: WindowId,
    start_year: i32,
    start_month: u32,
    start_day: u32,
    start_hour: u32,
    start_minute: u32,
    end_year: i32,
    end_month: u32,
    end_day: u32,
    end_hour: u32,
    end_minute: u32,
    #[serde(default)]
    repeat_weekly: bool,
}

impl TryFrom<WindowRecord> for TimeWindow {
    type Error = ValidationError;

    fn try_from(r: WindowRecord) -> Result<Self, Self::Error> {
        let start = CivilTime::new(
            r.start_year,
            r.start_month,
            r.start_day,
            r.start_hour,
            r.start_minute,
        );
        let end = CivilTime::new(r.end_year, r.end_month, r.end_day, r.end_hour, r.end_minute);
        if r.id.trim().is_empty() {
            return Err(ValidationError::invalid_value("id", "must not be empty"));
        }
        Ok(TimeWindow::new(start, end, r.repeat_weekly)?.with_id(r.id))
    }
}

impl From<TimeWindow> for WindowRecord {
    fn from(w: TimeWindow) -> Self {
        let start = CivilTime::from(w.start);
        let end = CivilTime::from(w.end);
        Self {
            id: w.id,
            start_year: start.year,
            start_month: start.month,
            start_day: start.day,
            start_hour: start.hour,
            start_minute: start.minute,
            end_year: end.year,
            end_month: end.month,
            end_day: end.day,
            end_hour: end.hour,
            end_minute: end.minute,
            repeat_weekly: w.repeat_weekly,
        }
    }
}
