//! Preference store: named scalar values that survive restarts.
//!
//! Values are stored as UTF-8 strings in a named sled tree
//! ("preferences"). Each key stands alone; there is no schema.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::StorageError;

/// Well-known preference keys.
pub mod keys {
    pub const LAST_CHECK_TIME: &str = "last_check_time";
    pub const LAST_REPAIR_TIME: &str = "last_repair_time";
    pub const LAST_OBSERVED_PREFIX: &str = "last_observed_prefix";
    pub const PERIODIC_CHECKS_ENABLED: &str = "periodic_checks_enabled";
    pub const AUTO_FIX_ENABLED: &str = "auto_fix_enabled";
}

/// Key-value store for scalar preferences.
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across async tasks.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;

    /// Make pending writes durable. No-op for volatile stores.
    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        Ok(self.get(key)?.and_then(|v| match v.as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        }))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.set(key, if value { "true" } else { "false" })
    }

    fn get_time(&self, key: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(self.get(key)?.and_then(|v| {
            DateTime::parse_from_rfc3339(&v)
                .ok()
                .map(|t| t.with_timezone(&Utc))
        }))
    }

    fn set_time(&self, key: &str, value: DateTime<Utc>) -> Result<(), StorageError> {
        self.set(key, &value.to_rfc3339())
    }
}

// ============================================================================
// Sled backend
// ============================================================================

/// Durable preferences in a sled database.
pub struct SledPreferences {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledPreferences {
    /// Open or create the preference database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path.as_ref())?;
        let tree = db.open_tree("preferences")?;
        tracing::info!(path = %path.as_ref().display(), "Preference store opened");
        Ok(Self { db, tree })
    }
}

impl PreferenceStore for SledPreferences {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.tree.get(key)? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| StorageError::Encoding(e.to_string())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.tree.insert(key, value.as_bytes())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.tree.remove(key)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-memory preferences for tests and `--ephemeral` runs. Not durable.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_get_set_remove() {
        let store = MemoryPreferences::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn typed_helpers() {
        let store = MemoryPreferences::new();
        store.set_bool(keys::PERIODIC_CHECKS_ENABLED, false).unwrap();
        assert_eq!(store.get_bool(keys::PERIODIC_CHECKS_ENABLED).unwrap(), Some(false));

        store.set("garbage", "maybe").unwrap();
        assert_eq!(store.get_bool("garbage").unwrap(), None);

        let now = Utc::now();
        store.set_time(keys::LAST_CHECK_TIME, now).unwrap();
        let read = store.get_time(keys::LAST_CHECK_TIME).unwrap().unwrap();
        assert_eq!(read.timestamp(), now.timestamp());
    }

    #[test]
    fn sled_store_survives_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("preferences.db");
        {
            let store = SledPreferences::open(&path).unwrap();
            store.set(keys::LAST_OBSERVED_PREFIX, "2001:db8:1:1::/64").unwrap();
            store.flush().unwrap();
        }
        let store = SledPreferences::open(&path).unwrap();
        assert_eq!(
            store.get(keys::LAST_OBSERVED_PREFIX).unwrap().as_deref(),
            Some("2001:db8:1:1::/64")
        );
        store.remove(keys::LAST_OBSERVED_PREFIX).unwrap();
        assert_eq!(store.get(keys::LAST_OBSERVED_PREFIX).unwrap(), None);
    }
}
