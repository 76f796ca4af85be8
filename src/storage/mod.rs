//! Persistent storage: scalar preferences and the single-instance lock.

pub mod lockfile;
pub mod preferences;

pub use lockfile::ProcessLock;
pub use preferences::{keys, MemoryPreferences, PreferenceStore, SledPreferences};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("stored value is not valid UTF-8: {0}")]
    Encoding(String),
}
