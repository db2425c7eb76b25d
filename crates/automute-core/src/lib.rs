//! # Automute Core Library
//!
//! This library decides when audio should be muted. Users describe "mute
//! windows" (one-shot or weekly); the library keeps a background loop that
//! sleeps exactly until the next window starts or ends, recomputes, and
//! hands the result to a mute effect supplied by the caller.
//!
//! ## Architecture
//!
//! - **Windows**: civil-time start/end pairs with a weekly-repeat flag,
//!   resolved against a reference instant
//! - **Engine**: a pure fold of all windows into one mute decision plus the
//!   delay until the next change
//! - **Storage**: TOML window store with atomic replace, and TOML configuration
//! - **Scheduler**: a cancellable, restartable Tokio loop driving the effect
//!
//! ## Key Components
//!
//! - [`TimeWindow`]: A mute window
//! - [`evaluate`]: Activation engine
//! - [`WindowStore`]: Window persistence
//! - [`Scheduler`] / [`MuteService`]: Background loop and its front-end facade

pub mod engine;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod storage;
pub mod window;

pub use engine::{evaluate, snapshot, EngineResult, WindowStatus};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use events::Event;
pub use scheduler::{
    Clock, ManualClock, MuteService, MuteSink, Scheduler, SchedulerOptions, SchedulerState,
    SchedulerStatus, SystemClock,
};
pub use storage::{Config, WindowStore};
pub use window::{resolve, CivilTime, ResolvedOccurrence, TimeWindow, WindowDraft, WindowId};
