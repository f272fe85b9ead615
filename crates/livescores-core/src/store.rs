// Key-value persistence for settings and credentials.
//
// Values are JSON. The SQLite store keeps a single `settings` table; the
// in-memory store backs tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open settings database at {path}: {source}")]
    Open {
        path: String,
        source: rusqlite::Error,
    },

    #[error("settings database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode or decode stored value: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("failed to create directory for {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },
}

/// Opaque get/set by string key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path`. Pass `":memory:"` for an
    /// ephemeral database.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                    path: path.to_string(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_string(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;

             CREATE TABLE IF NOT EXISTS settings (
                 key   TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )?;

        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves no partial row behind; keep going.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.conn();
        let text: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        match text {
            Some(t) => Ok(Some(serde_json::from_str(&t)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(value)?;
        self.conn().execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, text],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_db() -> SqliteStore {
        SqliteStore::open(":memory:").expect("in-memory database should open")
    }

    #[test]
    fn sqlite_round_trip() {
        let store = test_db();
        let value = json!({ "accessPassword": "pw", "fontScale": 1.5 });
        store.set("tls-settings", &value).unwrap();
        assert_eq!(store.get("tls-settings").unwrap(), Some(value));
    }

    #[test]
    fn sqlite_missing_key_is_none() {
        let store = test_db();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn sqlite_set_overwrites() {
        let store = test_db();
        store.set("k", &json!(1)).unwrap();
        store.set("k", &json!("two")).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!("two")));
    }

    #[test]
    fn sqlite_persists_across_reopen() {
        let dir = std::env::temp_dir().join("livescores_store_reopen");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("store.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::open(path).unwrap();
            store.set("tls_access_password", &json!("pw")).unwrap();
        }
        let store = SqliteStore::open(path).unwrap();
        assert_eq!(store.get("tls_access_password").unwrap(), Some(json!("pw")));

        drop(store);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn memory_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());
        store.set("k", &json!([1, 2])).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!([1, 2])));
    }
}
