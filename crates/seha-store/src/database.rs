//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees
//! that the schema exists before any other operation.  Two tables only:
//!
//! - `collections` — one row per entity collection, the value being the
//!   whole collection serialized as a JSON array.
//! - `local_kv` — small fixed-key string values (device backup key,
//!   last-synced timestamp).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY,
        json TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS local_kv (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/seha/seha.db`
    /// - macOS:   `~/Library/Application Support/com.seha.seha/seha.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\seha\seha\data\seha.db`
    pub fn new() -> Result<Self> {
        let project_dirs = ProjectDirs::from("com", "seha", "seha").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("seha.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// This is useful for tests and for embedding the store inside custom
    /// directory layouts.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Recommended SQLite settings.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        conn.execute_batch(SCHEMA)?;

        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }

    // -- collections ------------------------------------------------------

    /// Read a whole collection. A missing row is an empty collection.
    pub fn get_collection<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let json: Option<String> = self
            .conn
            .query_row("SELECT json FROM collections WHERE name = ?1", [name], |row| {
                row.get(0)
            })
            .optional()?;

        match json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Replace a whole collection.
    pub fn put_collection<T: Serialize>(&self, name: &str, items: &[T]) -> Result<()> {
        let json = serde_json::to_string(items)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO collections (name, json) VALUES (?1, ?2)",
            rusqlite::params![name, json],
        )?;
        Ok(())
    }

    /// Delete every collection row. Used by restore tests and the
    /// "wipe local data" path.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM collections", [])?;
        Ok(())
    }

    // -- local key-value --------------------------------------------------

    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM local_kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn kv_put(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO local_kv (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    /// Write only if the key is absent — the first writer wins.
    pub fn kv_put_if_absent(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO local_kv (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }
}
