//! Local key/value persistence.
//!
//! flightlog persists exactly like a browser app using local storage: a
//! handful of string keys holding opaque string values. [`SqliteStore`] backs
//! this with a single `SQLite` table; [`MemoryStore`] keeps everything in
//! process for tests and throwaway sessions.

pub mod migrations;
pub mod schema;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Key holding the JSON array of flights.
pub const FLIGHTS_KEY: &str = "flights";

/// Key holding the map provider access token.
pub const ACCESS_TOKEN_KEY: &str = "map_access_token";

/// A string-to-string store with local-storage semantics.
pub trait KeyValueStore {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Returns `true` if the key existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<bool>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key)
    }
}

/// `SQLite`-backed key/value store.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    ///
    /// Creates parent directories and initializes the schema as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory `SQLite` store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored keys, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM entries ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_keys: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;

        let total_value_bytes: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM entries",
            [],
            |row| row.get(0),
        )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_keys,
            total_value_bytes,
            db_size_bytes,
        })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM entries WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO entries (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value],
        )?;
        debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM entries WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }
}

/// Process-local key/value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.borrow_mut().remove(key).is_some())
    }
}


/// Read the persisted map access token, ignoring blank values.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn load_access_token(store: &impl KeyValueStore) -> Result<Option<String>> {
    Ok(store
        .get(ACCESS_TOKEN_KEY)?
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty()))
}

/// Persist the map access token. A blank token removes it.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
pub fn save_access_token(store: &impl KeyValueStore, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        store.remove(ACCESS_TOKEN_KEY)?;
    } else {
        store.set(ACCESS_TOKEN_KEY, token)?;
    }
    Ok(())
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of stored keys.
    pub total_keys: i64,
    /// Sum of value sizes in bytes.
    pub total_value_bytes: i64,
    /// Size of the database file in bytes (0 for in-memory).
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_storage() -> SqliteStore {
        SqliteStore::open_in_memory().expect("failed to create test storage")
    }

    #[test]
    fn test_open_in_memory() {
        let storage = create_test_storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_set_and_get() {
        let storage = create_test_storage();
        storage.set(FLIGHTS_KEY, "[]").unwrap();
        assert_eq!(storage.get(FLIGHTS_KEY).unwrap(), Some("[]".to_string()));
    }

    #[test]
    fn test_get_missing() {
        let storage = create_test_storage();
        assert_eq!(storage.get("nope").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites() {
        let storage = create_test_storage();
        storage.set("k", "one").unwrap();
        storage.set("k", "two").unwrap();
        assert_eq!(storage.get("k").unwrap(), Some("two".to_string()));
        assert_eq!(storage.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn test_remove() {
        let storage = create_test_storage();
        storage.set("k", "v").unwrap();
        assert!(storage.remove("k").unwrap());
        assert!(!storage.remove("k").unwrap());
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn test_unicode_value() {
        let storage = create_test_storage();
        storage.set("k", "São Paulo → Zürich").unwrap();
        assert_eq!(
            storage.get("k").unwrap().as_deref(),
            Some("São Paulo → Zürich")
        );
    }

    #[test]
    fn test_stats() {
        let storage = create_test_storage();
        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_keys, 0);
        assert_eq!(stats.total_value_bytes, 0);

        storage.set("a", "12345").unwrap();
        storage.set("b", "é").unwrap();
        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_keys, 2);
        assert_eq!(stats.total_value_bytes, 7);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_open_file_based_persists() {
        let db_path =
            std::env::temp_dir().join(format!("flightlog_test_{}.db", std::process::id()));

        {
            let storage = SqliteStore::open(&db_path).unwrap();
            storage.set(FLIGHTS_KEY, "[1]").unwrap();
            assert_eq!(storage.path(), db_path);
            assert_eq!(storage.stats().unwrap().total_keys, 1);
        }

        let reopened = SqliteStore::open(&db_path).unwrap();
        assert_eq!(reopened.get(FLIGHTS_KEY).unwrap().as_deref(), Some("[1]"));

        drop(reopened);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let root = std::env::temp_dir().join(format!("flightlog_test_dirs_{}", std::process::id()));
        let nested_path = root.join("nested/db.sqlite");
        let _ = std::fs::remove_dir_all(&root);

        let storage = SqliteStore::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(storage);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.set("k", "v").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert!(store.remove("k").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_through_reference() {
        let store = MemoryStore::new();
        let by_ref = &store;
        by_ref.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_access_token_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(load_access_token(&store).unwrap(), None);

        save_access_token(&store, "  pk.abc  ").unwrap();
        assert_eq!(load_access_token(&store).unwrap().as_deref(), Some("pk.abc"));

        save_access_token(&store, "").unwrap();
        assert_eq!(load_access_token(&store).unwrap(), None);
    }

    #[test]
    fn test_blank_persisted_token_is_ignored() {
        let store = MemoryStore::new();
        store.set(ACCESS_TOKEN_KEY, "   ").unwrap();
        assert_eq!(load_access_token(&store).unwrap(), None);
    }
}
