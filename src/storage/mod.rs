//! Key-value persistence for the entitlement record
//!
//! The tracker only needs string values under string keys:
//! - [`FileStore`]: one JSON file per key in the app data directory (durable)
//! - [`MemoryStore`]: process-local map, used by tests and ephemeral sessions

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Asynchronous key-value storage capability
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` when absent
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`; removing an absent key succeeds
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Short name for logs and status output
    fn backend_name(&self) -> &'static str;
}

/// Which [`KeyValueStore`] implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::File => write!(f, "file"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" | "disk" | "local" => Ok(StorageBackend::File),
            "memory" | "ephemeral" => Ok(StorageBackend::Memory),
            other => Err(format!("Unknown storage backend: {}", other)),
        }
    }
}

/// Keys double as file names: ASCII letters, digits, `-`, `_` and `.`,
/// not starting with a dot.
pub(crate) fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Build the configured store.
///
/// Falls back to [`MemoryStore`] when the data directory can't be used, so
/// the app keeps working (quota then only lasts for the session).
pub fn open_store(backend: StorageBackend, data_dir: &Path) -> Arc<dyn KeyValueStore> {
    match backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => match FileStore::open(data_dir) {
            Ok(store) => {
                tracing::debug!("Using file store at {:?}", data_dir);
                Arc::new(store)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to open file store at {:?}: {}; falling back to memory",
                    data_dir,
                    e
                );
                Arc::new(MemoryStore::new())
            }
        },
    }
}

/// Storage operation errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
