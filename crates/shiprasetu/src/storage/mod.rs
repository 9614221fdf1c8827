//! Storage layer for shiprasetu.
//!
//! A [`KeyValueStore`] holds named text blobs. [`SqliteStore`] is the
//! production substrate: several processes can open the same database file
//! and observe each other's writes. [`PersistentStore`] sits on top and maps
//! typed collections to JSON blobs.

pub mod migrations;
mod persist;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};

pub use persist::{CollectionKey, LoadSource, PersistentStore};

/// A string-keyed store of text values.
///
/// Implementations must be shareable between the container and its
/// synchronizer task.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<bool>;
}

/// `SQLite`-backed key-value store.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

/// Summary of one stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreEntry {
    /// Key name.
    pub key: String,
    /// Length of the stored text in bytes.
    pub size_bytes: u64,
    /// When the entry was last written (RFC 3339).
    pub updated_at: String,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
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

        // WAL lets other processes read while one writes.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store for testing.
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
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Describe every stored entry, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn entries(&self) -> Result<Vec<StoreEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT key, length(CAST(value AS BLOB)), updated_at FROM kv ORDER BY key",
        )?;
        let entries = stmt
            .query_map([], |row| {
                let size: i64 = row.get(1)?;
                Ok(StoreEntry {
                    key: row.get(0)?,
                    size_bytes: u64::try_from(size).unwrap_or(0),
                    updated_at: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave the connection half-written.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self
            .conn()
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        trace!(key, found = value.is_some(), "kv get");
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.conn().execute(
            r"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value, updated_at],
        )?;
        trace!(key, len = value.len(), "kv set");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let affected = self.conn().execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("failed to create test store")
    }

    fn temp_db_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("shiprasetu_{tag}_{}.db", std::process::id()))
    }

    fn cleanup(path: &Path) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
    }

    #[test]
    fn test_get_missing() {
        let store = create_test_store();
        assert!(store.get("nothing").unwrap().is_none());
    }

    #[test]
    fn test_set_and_get() {
        let store = create_test_store();
        store.set("alerts", "[]").unwrap();
        assert_eq!(store.get("alerts").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_set_overwrites() {
        let store = create_test_store();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();

        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
        assert_eq!(store.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_remove() {
        let store = create_test_store();
        store.set("k", "v").unwrap();

        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_entries_sorted_by_key() {
        let store = create_test_store();
        store.set("b", "2").unwrap();
        store.set("a", "1").unwrap();

        let keys: Vec<String> = store.entries().unwrap().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_unicode_value() {
        let store = create_test_store();
        let value = r#"[{"message":"त्रिवेणी घाट – भीड़"}]"#;
        store.set("alerts", value).unwrap();
        assert_eq!(store.get("alerts").unwrap().as_deref(), Some(value));
    }

    #[test]
    fn test_entries() {
        let store = create_test_store();
        store.set("x", "12345").unwrap();

        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "x");
        assert_eq!(entries[0].size_bytes, 5);
        assert!(!entries[0].updated_at.is_empty());
    }

    #[test]
    fn test_path_in_memory() {
        assert_eq!(create_test_store().path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_two_connections_share_file() {
        let path = temp_db_path("shared");
        cleanup(&path);

        let first = SqliteStore::open(&path).unwrap();
        let second = SqliteStore::open(&path).unwrap();

        first.set("alerts", "[1]").unwrap();
        assert_eq!(second.get("alerts").unwrap().as_deref(), Some("[1]"));

        second.remove("alerts").unwrap();
        assert!(first.get("alerts").unwrap().is_none());

        drop(first);
        drop(second);
        cleanup(&path);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let root = std::env::temp_dir().join(format!("shiprasetu_nested_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let nested = root.join("deeper").join("state.db");

        let store = SqliteStore::open(&nested).unwrap();
        assert!(nested.exists());
        assert_eq!(store.path(), nested);

        drop(store);
        let _ = std::fs::remove_dir_all(&root);
    }
}
