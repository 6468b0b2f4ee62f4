//! Recurring background tasks owned by the client.
//!
//! A [`ScheduledTask`] aborts its tokio task when dropped, so storing a new
//! task in an `Option<ScheduledTask>` slot cancels the previous one.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::trace;

// ============================================================================
// ScheduledTask
// ============================================================================

/// A recurring task cancelled on drop.
pub(crate) struct ScheduledTask {
    /// Name used in logs.
    name: &'static str,
    /// The running task.
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Runs `tick` every `period`, first one `period` from now.
    ///
    /// The task stops on its own once `tick` returns `false`.
    pub(crate) fn every<F>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !tick() {
                    break;
                }
            }
        });

        trace!(task = name, ?period, "Scheduled task started");
        Self { name, handle }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
        trace!(task = self.name, "Scheduled task cancelled");
    }
}

// ============================================================================
// Tests
// ============================================================================
