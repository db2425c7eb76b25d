//! Activation engine.
//!
//! Folds a set of windows into one mute decision and the delay until the
//! next start or end across all of them. [`evaluate`] is a pure function of
//! its inputs: the windows and the reference instant.

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};

use crate::window::{resolve, ResolvedOccurrence, TimeWindow};

/// Delay reported when there are no windows at all.
pub const NO_FURTHER_EVENTS: i64 = -1;

/// Delay used when no window has a future start or end.
pub const FALLBACK_DELAY_SECS: i64 = 1;

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineResult {
    pub active: bool,
    /// Seconds until the nearest future start or end, or `-1` when the
    /// window collection is empty.
    pub next_event_delay_secs: i64,
}

impl EngineResult {
    pub const IDLE: EngineResult = EngineResult {
        active: false,
        next_event_delay_secs: NO_FURTHER_EVENTS,
    };

    /// The delay as a duration, `None` when nothing will ever change.
    pub fn next_event_delay(&self) -> Option<std::time::Duration> {
        u64::try_from(self.next_event_delay_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .map(std::time::Duration::from_secs)
    }
}

/// Decide whether any window is active at `now` and when to look again.
pub fn evaluate<Tz: TimeZone>(windows: &[TimeWindow], now: &DateTime<Tz>) -> EngineResult {
    if windows.is_empty() {
        return EngineResult::IDLE;
    }

    let mut active = false;
    let mut next: Option<i64> = None;

    for window in windows {
        let occurrence = resolve(window, now);
        active |= occurrence.contains(now);

        for edge in [&occurrence.start, &occurrence.end] {
            if let Some(secs) = secs_until(now, edge) {
                next = Some(next.map_or(secs, |n| n.min(secs)));
            }
        }
    }

    EngineResult {
        active,
        next_event_delay_secs: next.unwrap_or(FALLBACK_DELAY_SECS),
    }
}

/// Whole seconds from `now` to a future `edge`, rounded up so a wakeup never
/// lands before the edge. `None` if the edge is not in the future.
fn secs_until<Tz: TimeZone>(now: &DateTime<Tz>, edge: &DateTime<Tz>) -> Option<i64> {
    let ms = edge
        .clone()
        .signed_duration_since(now.clone())
        .num_milliseconds();
    (ms > 0).then(|| (ms + 999) / 1000)
}

/// A window with its live status, for display.
#[derive(Debug, Clone, Serialize)]
pub struct WindowStatus {
    #[serde(flatten)]
    pub window: TimeWindow,
    pub active: bool,
    pub occurrence: ResolvedOccurrence<FixedOffset>,
}

/// Resolve every window against `now` for a status listing.
pub fn snapshot<Tz: TimeZone>(windows: &[TimeWindow], now: &DateTime<Tz>) -> Vec<WindowStatus> {
    windows
        .iter()
        .map(|window| {
            let occurrence = resolve(window, now);
            WindowStatus {
                window: window.clone(),
                active: occurrence.contains(now),
                occurrence: occurrence.fixed_offset(),
            }
        })
        .collect()
}
