//! System-wide default constants.
//!
//! Grouped by subsystem. Config structs fall back to these when a key is
//! absent from the TOML file.

// ============================================================================
// Interfaces
// ============================================================================

#[cfg(target_os = "macos")]
pub const PRIMARY_DEVICE: &str = "en0";
#[cfg(target_os = "macos")]
pub const PRIMARY_SERVICE: &str = "Ethernet";
#[cfg(target_os = "macos")]
pub const SECONDARY_DEVICE: &str = "en1";
#[cfg(target_os = "macos")]
pub const SECONDARY_SERVICE: &str = "Wi-Fi";

#[cfg(not(target_os = "macos"))]
pub const PRIMARY_DEVICE: &str = "eth0";
#[cfg(not(target_os = "macos"))]
pub const PRIMARY_SERVICE: &str = "eth0";
#[cfg(not(target_os = "macos"))]
pub const SECONDARY_DEVICE: &str = "wlan0";
#[cfg(not(target_os = "macos"))]
pub const SECONDARY_SERVICE: &str = "wlan0";

// ============================================================================
// Connectivity Probe
// ============================================================================

/// IPv6-literal HTTPS endpoints. Literals keep DNS and IPv4 fallback out of the test.
pub const PROBE_TARGETS: &[&str] = &[
    "https://[2606:4700:4700::1111]/",
    "https://[2001:4860:4860::8888]/",
];

/// Per-target request timeout (seconds).
pub const PROBE_TIMEOUT_SECS: u64 = 5;

/// Host pinged for diagnostics after a target fails.
pub const ECHO_HOST: &str = "ipv6.google.com";

pub const ECHO_COUNT: u32 = 2;

// ============================================================================
// Repair
// ============================================================================

/// Minimum time between two repair attempts (seconds).
pub const REPAIR_COOLDOWN_SECS: u64 = 60;

/// Wait after switching IPv6 to automatic, for router advertisements (seconds).
pub const REPAIR_SETTLE_SECS: u64 = 5;

/// Wait after the repair before the follow-up check (seconds).
pub const POST_REPAIR_SETTLE_SECS: u64 = 2;

// ============================================================================
// Schedule
// ============================================================================

/// Periodic check interval (seconds). 300 = 5 minutes.
pub const CHECK_INTERVAL_SECS: u64 = 300;

/// Path monitor polling interval (seconds).
pub const PATH_POLL_SECS: u64 = 5;

/// Delay between a path becoming satisfied and the check it triggers (seconds).
pub const PATH_CHANGE_DELAY_SECS: u64 = 3;

// ============================================================================
// Server / Storage / Log
// ============================================================================

pub const SERVER_ADDR: &str = "127.0.0.1:8787";

pub const DATA_DIR: &str = "./data";

/// Activity log ring capacity (entries).
pub const ACTIVITY_LOG_MAX_ENTRIES: usize = 500;

/// Entries returned by the log endpoint when no `limit` is given.
pub const API_LOG_DEFAULT_LIMIT: usize = 100;
