//! Published engine status and the process-wide repair state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

use super::repairer::RepairOutcome;
use crate::types::{HealthVerdict, InterfaceSnapshot, RouteInfo};

// ============================================================================
// Triggers and outcomes
// ============================================================================

/// What started a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Startup,
    Periodic,
    PathChange,
    Manual,
    /// Final re-check issued by the repair sequence itself
    PostRepair,
}

impl Trigger {
    /// Checks that must not interleave with an active repair.
    pub fn is_external(&self) -> bool {
        !matches!(self, Trigger::PostRepair)
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Startup => write!(f, "startup"),
            Trigger::Periodic => write!(f, "periodic"),
            Trigger::PathChange => write!(f, "path-change"),
            Trigger::Manual => write!(f, "manual"),
            Trigger::PostRepair => write!(f, "post-repair"),
        }
    }
}

/// What a call to `CheckCoordinator::check` ended up doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Verdict published, no repair attempted
    Published { generation: u64, verdict: HealthVerdict },
    /// A newer check started before this one finished; result discarded
    Superseded { generation: u64, current: u64 },
    /// A repair was running; the check did nothing
    SkippedRepairInProgress,
    /// Repair wanted but the cooldown window has not elapsed
    CooldownSkipped {
        generation: u64,
        verdict: HealthVerdict,
        remaining_secs: u64,
    },
    /// Repair ran; `verdict` is what the follow-up check published, if anything
    Repaired {
        generation: u64,
        repair: RepairOutcome,
        verdict: Option<HealthVerdict>,
    },
    /// Repair task died before reporting; `in_progress` was still cleared
    RepairAborted { generation: u64 },
}

impl CheckOutcome {
    /// Verdict this check caused to be published, if any.
    pub fn published_verdict(&self) -> Option<&HealthVerdict> {
        match self {
            CheckOutcome::Published { verdict, .. } | CheckOutcome::CooldownSkipped { verdict, .. } => {
                Some(verdict)
            }
            CheckOutcome::Repaired { verdict, .. } => verdict.as_ref(),
            CheckOutcome::Superseded { .. }
            | CheckOutcome::SkippedRepairInProgress
            | CheckOutcome::RepairAborted { .. } => None,
        }
    }
}

// ============================================================================
// Published status
// ============================================================================

/// The single authoritative status consumed by presentation layers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStatus {
    pub verdict: HealthVerdict,
    /// Generation of the check that produced `verdict`
    pub generation: u64,
    pub primary: Option<InterfaceSnapshot>,
    pub secondary: Option<InterfaceSnapshot>,
    pub route: Option<RouteInfo>,
    pub connectivity: Option<bool>,
    pub last_check_at: Option<DateTime<Utc>>,
    pub last_repair_at: Option<DateTime<Utc>>,
    pub last_repair_outcome: Option<RepairOutcome>,
    pub repair_in_progress: bool,
}

// ============================================================================
// Repair state
// ============================================================================

/// Process-wide repair bookkeeping. Only touched under the coordinator lock.
#[derive(Debug, Clone, Default)]
pub struct RepairState {
    pub in_progress: bool,
    /// Monotonic deadline before which no new repair may start
    pub cooldown_until: Option<Instant>,
    /// Wall-clock time of the last attempt, for display and persistence
    pub last_attempt_wall: Option<DateTime<Utc>>,
    pub last_result_at: Option<DateTime<Utc>>,
}

impl RepairState {
    /// Seed from a persisted attempt time so a restart keeps the cooldown.
    pub fn restored(last_attempt: Option<DateTime<Utc>>, cooldown: Duration) -> Self {
        Self::restored_at(last_attempt, cooldown, Utc::now())
    }

    /// Like [`RepairState::restored`] with an explicit wall-clock "now".
    ///
    /// The deadline is built forward from the current instant, so it holds
    /// even when the last attempt predates the monotonic clock (a reboot).
    /// An attempt stamped in the future counts as just made.
    pub fn restored_at(
        last_attempt: Option<DateTime<Utc>>,
        cooldown: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let cooldown_until = last_attempt.and_then(|wall| {
            let elapsed = (now - wall).to_std().unwrap_or(Duration::ZERO);
            cooldown
                .checked_sub(elapsed)
                .filter(|left| !left.is_zero())
                .map(deadline_after)
        });
        Self {
            in_progress: false,
            cooldown_until,
            last_attempt_wall: last_attempt,
            last_result_at: None,
        }
    }

    /// Time left before another repair may start, or `None` if allowed now.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        self.cooldown_until?
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }

    pub fn mark_started(&mut self, cooldown: Duration) {
        self.in_progress = true;
        self.cooldown_until = Some(deadline_after(cooldown));
        self.last_attempt_wall = Some(Utc::now());
    }

    pub fn mark_finished(&mut self) {
        self.in_progress = false;
        self.last_result_at = Some(Utc::now());
    }
}

/// Longest window honored; keeps `Instant` arithmetic from overflowing.
const MAX_COOLDOWN: Duration = Duration::from_secs(10 * 365 * 86_400);

fn deadline_after(window: Duration) -> Instant {
    Instant::now() + window.min(MAX_COOLDOWN)
}
