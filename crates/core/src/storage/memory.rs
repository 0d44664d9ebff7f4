//! In-process storage.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use serde_json::Value;

use super::{Storage, StorageError, StorageType, StoredItem};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<(StorageType, String), StoredItem>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item with an explicit creation date (for cache expiry tests).
    pub fn insert_stored(&self, store: StorageType, key: &str, item: StoredItem) -> Result<(), StorageError> {
        self.items
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .insert((store, key.to_string()), item);
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, store: StorageType, key: &str) -> Result<Option<StoredItem>, StorageError> {
        let items = self.items.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(items.get(&(store, key.to_string())).cloned())
    }

    fn set_item(&self, store: StorageType, key: &str, value: Value) -> Result<(), StorageError> {
        self.insert_stored(
            store,
            key,
            StoredItem {
                value,
                creation_date: Utc::now(),
            },
        )
    }

    fn remove_item(&self, store: StorageType, key: &str) -> Result<(), StorageError> {
        self.items
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .remove(&(store, key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_remove() {
        let storage = MemoryStorage::new();
        storage
            .set_item(StorageType::Database, "cabinet_cache", json!([1, 2]))
            .unwrap();

        let item = storage
            .get_item(StorageType::Database, "cabinet_cache")
            .unwrap()
            .unwrap();
        assert_eq!(item.value, json!([1, 2]));

        storage
            .remove_item(StorageType::Database, "cabinet_cache")
            .unwrap();
        assert!(storage
            .get_item(StorageType::Database, "cabinet_cache")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_stores_are_separate() {
        let storage = MemoryStorage::new();
        storage.set_item(StorageType::Local, "k", json!("local")).unwrap();

        assert!(storage.get_item(StorageType::Mailbox, "k").unwrap().is_none());
    }
}
