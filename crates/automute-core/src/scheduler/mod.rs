//! Background mute scheduler.
//!
//! The scheduler owns at most one background loop. Each cycle reloads the
//! window store (pruning expired one-shot windows), evaluates the windows
//! against the clock, hands the result to the [`MuteSink`], and then sleeps
//! until the next start or end. The sleep races a cancellation token so a
//! stop or restart never waits behind it.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped -> Running -> StopRequested -> Stopped
//!               \___________________________/
//!                 (no windows left: loop ends)
//! ```
//!
//! `stop()` cancels the loop and awaits its task before returning, and
//! `start()` on a running scheduler stops first, so two loops never race on
//! the store.

mod effect;
mod service;

pub use effect::{Clock, ManualClock, MuteSink, SystemClock};
pub use service::MuteService;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::{evaluate, EngineResult};
use crate::error::StoreError;
use crate::events::Event;
use crate::storage::{SchedulerConfig, WindowStore};
use crate::window::TimeWindow;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Stopped,
    Running,
    StopRequested,
}

/// Live view of the scheduler for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    /// Last value handed to the sink, if any cycle has applied one.
    pub muted: Option<bool>,
    /// When the loop will next wake, while it is sleeping.
    pub next_wake: Option<DateTime<Local>>,
    /// Message of the most recent failed cycle; cleared by a good cycle.
    pub last_error: Option<String>,
    /// Number of cycles run since the scheduler was created.
    pub cycles: u64,
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        Self {
            state: SchedulerState::Stopped,
            muted: None,
            next_wake: None,
            last_error: None,
            cycles: 0,
        }
    }
}

/// Loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Wait after a failed cycle.
    pub error_backoff: Duration,
    /// Upper bound on one sleep, to re-check the wall clock periodically.
    pub max_sleep: Option<Duration>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptions::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for SchedulerOptions {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            error_backoff: config.error_backoff(),
            max_sleep: config.max_sleep(),
        }
    }
}

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Cancellable, restartable mute scheduler.
pub struct Scheduler {
    store: Arc<WindowStore>,
    sink: Arc<dyn MuteSink>,
    clock: Arc<dyn Clock>,
    options: SchedulerOptions,
    status: Arc<watch::Sender<SchedulerStatus>>,
    events: broadcast::Sender<Event>,
    running: Mutex<Option<RunningLoop>>,
}

impl Scheduler {
    /// Create a stopped scheduler using the system clock.
    pub fn new(store: Arc<WindowStore>, sink: Arc<dyn MuteSink>) -> Self {
        let (status, _) = watch::channel(SchedulerStatus::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            sink,
            clock: Arc::new(SystemClock),
            options: SchedulerOptions::default(),
            status: Arc::new(status),
            events,
            running: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: SchedulerOptions) -> Self {
        self.options = options;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn store(&self) -> &Arc<WindowStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.subscribe()
    }

    /// Subscribe to scheduler events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the loop. A loop that is already running is stopped and joined
    /// first.
    pub async fn start(&self) {
        let mut slot = self.running.lock().await;
        self.stop_locked(&mut slot).await;
        self.spawn_locked(&mut slot);
    }

    /// Request the loop to end, wake it, and wait until it has exited.
    /// Safe to call when nothing is running.
    pub async fn stop(&self) {
        let mut slot = self.running.lock().await;
        self.stop_locked(&mut slot).await;
    }

    /// Stop, then start, so the next cycle sees the current store contents.
    pub async fn restart(&self) {
        let mut slot = self.running.lock().await;
        debug!("restarting mute scheduler");
        self.stop_locked(&mut slot).await;
        self.spawn_locked(&mut slot);
    }

    /// Stop and join the loop, consuming the scheduler.
    pub async fn shutdown(self) {
        self.stop().await;
    }

    pub(crate) fn emit(&self, event: Event) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn stop_locked(&self, slot: &mut Option<RunningLoop>) {
        let Some(running) = slot.take() else {
            return;
        };
        if !running.handle.is_finished() {
            self.status
                .send_modify(|s| s.state = SchedulerState::StopRequested);
        }
        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            warn!(error = %e, "mute scheduler loop ended abnormally");
        }
        self.status.send_modify(|s| {
            s.state = SchedulerState::Stopped;
            s.next_wake = None;
        });
        debug!("mute scheduler loop joined");
    }

    fn spawn_locked(&self, slot: &mut Option<RunningLoop>) {
        let cancel = CancellationToken::new();
        let cycle = CycleRunner {
            store: self.store.clone(),
            sink: self.sink.clone(),
            clock: self.clock.clone(),
            options: self.options,
            status: self.status.clone(),
            events: self.events.clone(),
        };

        self.status.send_modify(|s| s.state = SchedulerState::Running);
        self.emit(Event::SchedulerStarted {
            at: self.clock.now().with_timezone(&Utc),
        });
        info!("mute scheduler started");

        let handle = tokio::spawn(cycle.run(cancel.clone()));
        *slot = Some(RunningLoop { cancel, handle });
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Without an async context the loop can only be told to end.
        if let Ok(mut slot) = self.running.try_lock() {
            if let Some(running) = slot.take() {
                running.cancel.cancel();
            }
        }
    }
}

/// Everything one background loop needs, detached from the `Scheduler`.
struct CycleRunner {
    store: Arc<WindowStore>,
    sink: Arc<dyn MuteSink>,
    clock: Arc<dyn Clock>,
    options: SchedulerOptions,
    status: Arc<watch::Sender<SchedulerStatus>>,
    events: broadcast::Sender<Event>,
}

impl CycleRunner {
    async fn run(self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let now = self.clock.now();
            let wait = match run_blocking(&self.store, move |store| store.prune(&now)).await {
                Ok(windows) => {
                    let result = evaluate(&windows, &now);
                    self.sink.set_muted(result.active);
                    match result.next_event_delay() {
                        Some(delay) => {
                            let delay = self.options.max_sleep.map_or(delay, |max| delay.min(max));
                            self.applied(&windows, result, now, Some(delay));
                            delay
                        }
                        None => {
                            self.applied(&windows, result, now, None);
                            info!(muted = result.active, "no mute windows left, scheduler loop finished");
                            break;
                        }
                    }
                }
                Err(err) => {
                    self.failed(&err, now);
                    self.options.error_backoff
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        self.status.send_modify(|s| {
            s.state = SchedulerState::Stopped;
            s.next_wake = None;
        });
        let _ = self.events.send(Event::SchedulerStopped {
            at: self.clock.now().with_timezone(&Utc),
        });
        info!("mute scheduler stopped");
    }

    fn applied(
        &self,
        windows: &[TimeWindow],
        result: EngineResult,
        now: DateTime<Local>,
        sleep: Option<Duration>,
    ) {
        let next_wake = sleep
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| now + d);
        self.status.send_modify(|s| {
            s.muted = Some(result.active);
            s.next_wake = next_wake;
            s.last_error = None;
            s.cycles += 1;
        });
        info!(
            muted = result.active,
            windows = windows.len(),
            next_event_delay_secs = result.next_event_delay_secs,
            "applied mute state"
        );
        let _ = self.events.send(Event::MuteApplied {
            muted: result.active,
            next_event_delay_secs: result.next_event_delay_secs,
            window_count: windows.len(),
            at: now.with_timezone(&Utc),
        });
    }

    fn failed(&self, err: &StoreError, now: DateTime<Local>) {
        let backoff = self.options.error_backoff;
        error!(error = %err, retry_in_secs = backoff.as_secs(), "mute cycle failed");
        let message = err.to_string();
        self.status.send_modify(|s| {
            s.last_error = Some(message.clone());
            s.next_wake = chrono::Duration::from_std(backoff).ok().map(|d| now + d);
            s.cycles += 1;
        });
        let _ = self.events.send(Event::CycleFailed {
            error: message,
            retry_in_secs: backoff.as_secs(),
            at: now.with_timezone(&Utc),
        });
    }
}

/// Run a store operation on the blocking pool.
pub(crate) async fn run_blocking<T, F>(store: &Arc<WindowStore>, op: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&WindowStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = store.clone();
    let path = store.path().to_path_buf();
    match tokio::task::spawn_blocking(move || op(&store)).await {
        Ok(result) => result,
        Err(e) => Err(StoreError::unavailable(path, std::io::Error::other(e))),
    }
}
