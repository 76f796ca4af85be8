//! API route handlers
//!
//! - status and liveness
//! - activity log
//! - manual check
//! - runtime settings (auto-fix, periodic checks)

mod activity;
mod check;
mod settings;
mod status;

pub use activity::*;
pub use check::*;
pub use settings::*;
pub use status::*;

use std::sync::Arc;
use std::time::Instant;

use crate::pipeline::CheckCoordinator;
use crate::storage::PreferenceStore;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub coordinator: Arc<CheckCoordinator>,
    pub prefs: Arc<dyn PreferenceStore>,
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(coordinator: Arc<CheckCoordinator>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self {
            coordinator,
            prefs,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
