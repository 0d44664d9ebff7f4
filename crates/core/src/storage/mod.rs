//! Key-value storage for cached data.

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};

/// Logical store an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// Browser-local style storage.
    Local,
    /// Settings roamed with the mailbox.
    Mailbox,
    /// Larger cached documents.
    Database,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Local => "local",
            StorageType::Mailbox => "mailbox",
            StorageType::Database => "database",
        }
    }
}

/// A stored value with the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub value: Value,
    pub creation_date: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Storage backend.
pub trait Storage: Send + Sync {
    fn get_item(&self, store: StorageType, key: &str) -> Result<Option<StoredItem>, StorageError>;

    /// Store `value`, stamping it with the current time.
    fn set_item(&self, store: StorageType, key: &str, value: Value) -> Result<(), StorageError>;

    fn remove_item(&self, store: StorageType, key: &str) -> Result<(), StorageError>;
}

/// Open the backend selected in the config.
pub fn open_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>, StorageError> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStorage::new(&config.path)?)),
    }
}
