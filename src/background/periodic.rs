//! Periodic trigger: runs a check every `schedule.interval_secs`.
//!
//! The `periodic_checks_enabled` preference is read on each tick, so the
//! timer can be paused at runtime without restarting the task.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::pipeline::{CheckCoordinator, Trigger};
use crate::storage::{keys, PreferenceStore};

pub struct PeriodicChecker {
    coordinator: Arc<CheckCoordinator>,
    prefs: Arc<dyn PreferenceStore>,
    interval: Duration,
}

impl PeriodicChecker {
    pub fn new(
        coordinator: Arc<CheckCoordinator>,
        prefs: Arc<dyn PreferenceStore>,
        interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            prefs,
            interval,
        }
    }

    /// Missing or unreadable preference means enabled.
    pub fn enabled(&self) -> bool {
        self.prefs
            .get_bool(keys::PERIODIC_CHECKS_ENABLED)
            .ok()
            .flatten()
            .unwrap_or(true)
    }

    /// Tick until cancelled. The first tick fires one interval after start;
    /// the startup check is issued separately.
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Periodic checks started");

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(ticks, "Periodic checks stopped");
                    return;
                }
                _ = ticker.tick() => {
                    ticks += 1;
                    if !self.enabled() {
                        debug!("Periodic check skipped: disabled");
                        continue;
                    }
                    let outcome = self.coordinator.check(Trigger::Periodic, true).await;
                    debug!(?outcome, "Periodic check finished");
                }
            }
        }
    }
}
