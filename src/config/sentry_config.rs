//! Sentry Configuration - interfaces, probe, repair timing and schedule as
//! TOML values.
//!
//! Every section implements `Default` from `defaults.rs`, so an empty file
//! (or no file) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;
use crate::types::InterfaceId;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "IPV6_SENTRY_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "ipv6_sentry.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `SentryConfig::load()` which searches:
/// 1. `$IPV6_SENTRY_CONFIG` env var
/// 2. `./ipv6_sentry.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentryConfig {
    #[serde(default)]
    pub interfaces: InterfacesConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub repair: RepairConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// HTTP status API
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Activity log
    #[serde(default)]
    pub log: LogConfig,
}

impl SentryConfig {
    /// Load configuration using the standard search order:
    /// 1. `$IPV6_SENTRY_CONFIG` environment variable
    /// 2. `./ipv6_sentry.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate TOML text. Unknown keys are logged as warnings.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let primary = &self.interfaces.primary;
        let secondary = &self.interfaces.secondary;
        for (name, iface) in [("primary", primary), ("secondary", secondary)] {
            if iface.device.trim().is_empty() {
                errors.push(format!("interfaces.{name}.device must not be empty"));
            }
        }
        if !primary.device.is_empty() && primary.device == secondary.device {
            errors.push(format!(
                "interfaces.primary.device and interfaces.secondary.device are both '{}'",
                primary.device
            ));
        }

        if self.probe.targets.is_empty() {
            errors.push("probe.targets must list at least one URL".to_string());
        }
        for target in &self.probe.targets {
            if !(target.starts_with("https://") || target.starts_with("http://")) {
                errors.push(format!("probe.targets entry '{target}' is not an http(s) URL"));
            }
        }

        Self::check_nonzero(self.probe.timeout_secs, "probe.timeout_secs", &mut errors);
        Self::check_nonzero(self.schedule.interval_secs, "schedule.interval_secs", &mut errors);
        Self::check_nonzero(self.schedule.path_poll_secs, "schedule.path_poll_secs", &mut errors);
        Self::check_nonzero(self.log.max_entries as u64, "log.max_entries", &mut errors);

        if self.server.enabled && self.server.addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!("server.addr '{}' is not a socket address", self.server.addr));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_nonzero(value: u64, name: &str, errors: &mut Vec<String>) {
        if value == 0 {
            errors.push(format!("{name} must be > 0"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),
    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Interfaces
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfacesConfig {
    /// Interface that gets repaired
    #[serde(default = "default_primary")]
    pub primary: InterfaceConfig,

    /// Observed only, never reconfigured
    #[serde(default = "default_secondary")]
    pub secondary: InterfaceConfig,
}

fn default_primary() -> InterfaceConfig {
    InterfaceConfig::new(defaults::PRIMARY_DEVICE, defaults::PRIMARY_SERVICE)
}
fn default_secondary() -> InterfaceConfig {
    InterfaceConfig::new(defaults::SECONDARY_DEVICE, defaults::SECONDARY_SERVICE)
}

impl Default for InterfacesConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// Kernel device name (`en0`, `eth0`)
    #[serde(default)]
    pub device: String,

    /// Name used by the reconfiguration tool; falls back to `device`
    #[serde(default)]
    pub service: Option<String>,
}

impl InterfaceConfig {
    pub fn new(device: &str, service: &str) -> Self {
        Self {
            device: device.to_string(),
            service: Some(service.to_string()),
        }
    }

    pub fn to_interface_id(&self) -> InterfaceId {
        match self.service.as_deref().filter(|s| !s.is_empty()) {
            Some(service) => InterfaceId::new(&self.device, service),
            None => InterfaceId::device_only(&self.device),
        }
    }
}

// ============================================================================
// Probe
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_targets")]
    pub targets: Vec<String>,

    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_echo_host")]
    pub echo_host: String,

    #[serde(default = "default_echo_count")]
    pub echo_count: u32,
}

fn default_probe_targets() -> Vec<String> {
    defaults::PROBE_TARGETS.iter().map(|s| s.to_string()).collect()
}
fn default_probe_timeout() -> u64 { defaults::PROBE_TIMEOUT_SECS }
fn default_echo_host() -> String { defaults::ECHO_HOST.to_string() }
fn default_echo_count() -> u32 { defaults::ECHO_COUNT }

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            targets: default_probe_targets(),
            timeout_secs: default_probe_timeout(),
            echo_host: default_echo_host(),
            echo_count: default_echo_count(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Repair
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairConfig {
    /// Initial auto-fix setting; a value persisted through the API wins
    #[serde(default = "default_true")]
    pub auto_fix: bool,

    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,

    #[serde(default = "default_settle")]
    pub settle_secs: u64,

    #[serde(default = "default_post_repair_settle")]
    pub post_repair_settle_secs: u64,
}

fn default_true() -> bool { true }
fn default_cooldown() -> u64 { defaults::REPAIR_COOLDOWN_SECS }
fn default_settle() -> u64 { defaults::REPAIR_SETTLE_SECS }
fn default_post_repair_settle() -> u64 { defaults::POST_REPAIR_SETTLE_SECS }

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            auto_fix: true,
            cooldown_secs: default_cooldown(),
            settle_secs: default_settle(),
            post_repair_settle_secs: default_post_repair_settle(),
        }
    }
}

// ============================================================================
// Schedule
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_path_poll")]
    pub path_poll_secs: u64,

    #[serde(default = "default_path_change_delay")]
    pub path_change_delay_secs: u64,
}

fn default_interval() -> u64 { defaults::CHECK_INTERVAL_SECS }
fn default_path_poll() -> u64 { defaults::PATH_POLL_SECS }
fn default_path_change_delay() -> u64 { defaults::PATH_CHANGE_DELAY_SECS }

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            path_poll_secs: default_path_poll(),
            path_change_delay_secs: default_path_change_delay(),
        }
    }
}

// ============================================================================
// Server / Storage / Log
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bind address. Overridden by `--addr`.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String { defaults::SERVER_ADDR.to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: default_server_addr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Holds the preference database and the lock file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf { PathBuf::from(defaults::DATA_DIR) }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

impl StorageConfig {
    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("preferences.db")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_max_entries() -> usize { defaults::ACTIVITY_LOG_MAX_ENTRIES }

impl Default for LogConfig {
    fn default() -> Self {
        Self { max_entries: default_max_entries() }
    }
}
