use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::window::WindowId;

/// Every state change in the system produces an Event.
/// Front ends subscribe to them through [`crate::Scheduler::subscribe`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SchedulerStarted {
        at: DateTime<Utc>,
    },
    /// One cycle resolved the windows and applied the mute state.
    MuteApplied {
        muted: bool,
        /// Seconds until the next start/end, `-1` when there are no windows.
        next_event_delay_secs: i64,
        window_count: usize,
        at: DateTime<Utc>,
    },
    /// A cycle could not read the window store. Nothing was applied.
    CycleFailed {
        error: String,
        retry_in_secs: u64,
        at: DateTime<Utc>,
    },
    SchedulerStopped {
        at: DateTime<Utc>,
    },
    WindowAdded {
        id: WindowId,
        at: DateTime<Utc>,
    },
    WindowRemoved {
        id: WindowId,
        at: DateTime<Utc>,
    },
}
