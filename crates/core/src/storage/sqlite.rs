//! SQLite-backed storage.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{Storage, StorageError, StorageType, StoredItem};

pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|e| StorageError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database (useful for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StorageError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StorageError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS storage_items (
                store TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                creation_date TEXT NOT NULL,
                PRIMARY KEY (store, key)
            );
            "#,
        )
        .map_err(|e| StorageError::Database(e.to_string()))
    }
}

impl Storage for SqliteStorage {
    fn get_item(&self, store: StorageType, key: &str) -> Result<Option<StoredItem>, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT value, creation_date FROM storage_items WHERE store = ?1 AND key = ?2",
                params![store.as_str(), key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let Some((value_json, created_str)) = row else {
            return Ok(None);
        };

        let value: Value = serde_json::from_str(&value_json)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let creation_date = DateTime::parse_from_rfc3339(&created_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        Ok(Some(StoredItem {
            value,
            creation_date,
        }))
    }

    fn set_item(&self, store: StorageType, key: &str, value: Value) -> Result<(), StorageError> {
        let value_json =
            serde_json::to_string(&value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        conn.execute(
            "INSERT OR REPLACE INTO storage_items (store, key, value, creation_date) VALUES (?1, ?2, ?3, ?4)",
            params![store.as_str(), key, value_json, Utc::now().to_rfc3339()],
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }

    fn remove_item(&self, store: StorageType, key: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        conn.execute(
            "DELETE FROM storage_items WHERE store = ?1 AND key = ?2",
            params![store.as_str(), key],
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }
}
