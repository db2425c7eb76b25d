//! Resolution of a window against a reference instant.
//!
//! One-shot windows resolve to their literal instants. Weekly windows are
//! shifted forward by whole weeks of absolute time until the occurrence end
//! is at or after the reference instant; both endpoints move by the same
//! amount, so the occurrence keeps the literal window's length.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone};
use serde::Serialize;

use super::TimeWindow;

/// Length of one repeat period in seconds.
pub const SECONDS_PER_WEEK: i64 = 7 * 24 * 60 * 60;

/// A window's effective start/end for a given reference instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOccurrence<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> ResolvedOccurrence<Tz> {
    /// Half-open containment: the end instant itself is not inside.
    pub fn contains(&self, at: &DateTime<Tz>) -> bool {
        *at >= self.start && *at < self.end
    }

    pub fn fixed_offset(&self) -> ResolvedOccurrence<FixedOffset> {
        ResolvedOccurrence {
            start: self.start.fixed_offset(),
            end: self.end.fixed_offset(),
        }
    }
}

impl Serialize for ResolvedOccurrence<FixedOffset> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("ResolvedOccurrence", 2)?;
        s.serialize_field("start", &self.start)?;
        s.serialize_field("end", &self.end)?;
        s.end()
    }
}

/// Convert a civil timestamp to an instant in `tz`.
///
/// Ambiguous civil times (the repeated hour when clocks go back) map to the
/// earlier instant. Civil times inside a spring-forward gap map to the same
/// wall time one hour later, the way `mktime` normalises them.
pub fn to_instant<Tz: TimeZone>(tz: &Tz, civil: NaiveDateTime) -> DateTime<Tz> {
    if let Some(t) = tz.from_local_datetime(&civil).earliest() {
        return t;
    }
    tz.from_local_datetime(&(civil + Duration::hours(1)))
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&civil))
}

/// Resolve `window` to its current occurrence as of `reference`.
///
/// For a weekly window whose literal end is before `reference`, the number
/// of weeks added is `floor((reference - end) / week) + 1`. A reference
/// inside the literal occurrence (or before it) returns the literal instants.
pub fn resolve<Tz: TimeZone>(
    window: &TimeWindow,
    reference: &DateTime<Tz>,
) -> ResolvedOccurrence<Tz> {
    let tz = reference.timezone();
    let start = to_instant(&tz, window.start());
    let end = to_instant(&tz, window.end());

    if !window.repeat_weekly() || *reference <= end {
        return ResolvedOccurrence { start, end };
    }

    let behind_secs = reference
        .clone()
        .signed_duration_since(end.clone())
        .num_seconds();
    let weeks = behind_secs / SECONDS_PER_WEEK + 1;
    let shift = Duration::seconds(weeks * SECONDS_PER_WEEK);
    ResolvedOccurrence {
        start: start + shift,
        end: end + shift,
    }
}
