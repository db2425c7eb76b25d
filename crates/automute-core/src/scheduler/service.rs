//! Front-end facing entry point.
//!
//! Adding or removing a window writes through the store and then restarts
//! the scheduler, so the very next cycle reflects the change instead of
//! waiting out a sleep computed from the old window set.

use chrono::{DateTime, Utc};

use super::{run_blocking, Scheduler};
use crate::engine::{snapshot, WindowStatus};
use crate::error::Result;
use crate::events::Event;
use crate::window::{TimeWindow, WindowDraft};

pub struct MuteService {
    scheduler: Scheduler,
}

impl MuteService {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Store a new window and restart the scheduler. The append completes
    /// before the restart, so the new cycle's load observes the window.
    pub async fn add_window(&self, window: TimeWindow) -> Result<TimeWindow> {
        let stored = run_blocking(self.scheduler.store(), move |store| store.append(window)).await?;
        self.scheduler.emit(Event::WindowAdded {
            id: stored.id().to_string(),
            at: self.event_time(),
        });
        self.scheduler.restart().await;
        Ok(stored)
    }

    /// Place a weekday draft on the calendar (relative to the scheduler's
    /// clock) and add it.
    pub async fn add_draft(&self, draft: &WindowDraft) -> Result<TimeWindow> {
        let now = self.scheduler.clock().now().naive_local();
        let window = draft.resolve(now)?;
        self.add_window(window).await
    }

    /// Remove a window and restart the scheduler if anything changed.
    pub async fn remove_window(&self, id: &str) -> Result<bool> {
        let owned = id.to_string();
        let removed = run_blocking(self.scheduler.store(), move |store| store.remove(&owned)).await?;
        if removed {
            self.scheduler.emit(Event::WindowRemoved {
                id: id.to_string(),
                at: self.event_time(),
            });
            self.scheduler.restart().await;
        }
        Ok(removed)
    }

    /// Current windows with their live status. Read-only; nothing is pruned.
    pub async fn windows_snapshot(&self) -> Result<Vec<WindowStatus>> {
        let now = self.scheduler.clock().now();
        let windows = run_blocking(self.scheduler.store(), |store| store.load()).await?;
        Ok(snapshot(&windows, &now))
    }

    fn event_time(&self) -> DateTime<Utc> {
        self.scheduler.clock().now().with_timezone(&Utc)
    }

    /// Stop and join the scheduler loop.
    pub async fn shutdown(self) {
        self.scheduler.shutdown().await;
    }
}
