//! ipv6-sentry: IPv6 health monitoring and router-advertisement loss repair
//!
//! Watches a primary (wired) and secondary (wireless) interface, decides
//! whether IPv6 is healthy, and when the primary has lost its router
//! advertisements renews and pins its configuration.
//!
//! ## Architecture
//!
//! - **acquisition**: interface addressing, default route, HTTPS reachability
//! - **pipeline**: classifier, repairer, and the check coordinator
//! - **background**: periodic and path-change trigger sources
//! - **api**: local HTTP status API
//! - **platform**: OS command backends (macOS `networksetup`, Linux `nmcli`)
//! - **storage**: preference store and single-instance lock

pub mod acquisition;
pub mod api;
pub mod background;
pub mod config;
pub mod pipeline;
pub mod platform;
pub mod storage;
pub mod types;

pub use config::SentryConfig;

pub use types::{
    HealthVerdict, InterfaceId, InterfaceSnapshot, Prefix, PrefixTransition, RouteInfo,
    VerdictKind, VerdictReason, PREFIX_LENGTH,
};

pub use pipeline::{
    ActivityLog, CheckCoordinator, CheckOutcome, CoordinatorSettings, EngineStatus, RepairOutcome,
    Trigger,
};

pub use platform::SystemOps;

pub use storage::{MemoryPreferences, PreferenceStore, SledPreferences, StorageError};
