//! Collaborators the scheduler drives: the mute effect and the clock.

use chrono::{DateTime, Duration, Local};
use std::sync::Mutex;

/// Receives the resolved mute state once per cycle.
///
/// Implementations must be idempotent and must not block for long; the
/// scheduler calls them from its loop.
pub trait MuteSink: Send + Sync + 'static {
    fn set_muted(&self, muted: bool);
}

impl<F> MuteSink for F
where
    F: Fn(bool) + Send + Sync + 'static,
{
    fn set_muted(&self, muted: bool) {
        self(muted)
    }
}

/// Source of local civil time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock in the system time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
///
/// Used for evaluating at a chosen instant and in tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn closures_are_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let sink = move |muted: bool| recorder.lock().unwrap().push(muted);
        sink.set_muted(true);
        sink.set_muted(false);
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn manual_clock_moves_only_when_told() {
        let start = Local::now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), start + Duration::minutes(5));
    }
}
