//! Health Check Pipeline
//!
//! ```text
//! trigger -> coordinator -> gather (interfaces, route, probe)
//!                        -> classifier (pure)
//!                        -> publish / repairer -> post-repair check
//! ```
//!
//! Every trigger source funnels through `CheckCoordinator::check`, which is
//! the only writer of the published `EngineStatus`.

pub mod activity;
pub mod classifier;
mod coordinator;
pub mod repairer;
mod state;

pub use activity::{ActivityLog, LogEntry, LogLevel};
pub use classifier::{classify, should_probe, Assessment, Observation};
pub use coordinator::{CheckCoordinator, CoordinatorSettings};
pub use repairer::{InconclusiveReason, InterfaceRepairer, RepairOutcome};
pub use state::*;
