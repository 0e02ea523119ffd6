//! Storage layer for roster.
//!
//! Everything the application persists is a string value under a string
//! key, split across two scopes:
//!
//! - [`Scope::Durable`] survives indefinitely (the roster and the theme flag).
//! - [`Scope::Session`] is short-lived (the signed-in identity). Entries
//!   expire after an idle timeout, the way a browser session ends.
//!
//! [`Storage`] is the `SQLite` implementation; [`MemoryStore`] keeps
//! everything in process memory.

mod memory;
pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::StudentRecord;
use crate::session::Session;

pub use memory::MemoryStore;

/// Store key holding the roster as a JSON array.
pub const STUDENTS_KEY: &str = "students";

/// Store key holding the theme flag, `"true"` or `"false"`.
pub const DARK_MODE_KEY: &str = "darkMode";

/// Session-scoped store key holding the signed-in identity.
pub const CURRENT_USER_KEY: &str = "currentUser";

/// Lifetime class of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Kept until overwritten or removed.
    Durable,
    /// Discarded once the session idles out.
    Session,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Durable => write!(f, "durable"),
            Self::Session => write!(f, "session"),
        }
    }
}

/// A string-valued key/value store.
///
/// Writes are whole-value overwrites; there are no partial updates.
pub trait PersistenceStore {
    /// Read the value under `key`, if present and live.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&mut self, scope: Scope, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&mut self, scope: Scope, key: &str) -> Result<()>;
}

/// Load the roster. A missing key is an empty roster.
///
/// # Errors
///
/// Returns [`Error::CorruptValue`] if the stored JSON cannot be decoded, or
/// a storage error if the store cannot be read.
pub fn load_roster<S: PersistenceStore + ?Sized>(store: &S) -> Result<Vec<StudentRecord>> {
    let Some(raw) = store.get(Scope::Durable, STUDENTS_KEY)? else {
        return Ok(Vec::new());
    };
    let records: Vec<StudentRecord> =
        serde_json::from_str(&raw).map_err(|source| Error::CorruptValue {
            key: STUDENTS_KEY,
            source,
        })?;
    debug!("Loaded {} records", records.len());
    Ok(records)
}

/// Overwrite the stored roster.
///
/// # Errors
///
/// Returns an error if serialization or the store write fails.
pub fn save_roster<S: PersistenceStore + ?Sized>(
    store: &mut S,
    records: &[StudentRecord],
) -> Result<()> {
    let raw = serde_json::to_string(records)?;
    store.set(Scope::Durable, STUDENTS_KEY, &raw)?;
    debug!("Saved {} records", records.len());
    Ok(())
}

/// Load the theme flag. Anything other than `"true"` is light mode.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn load_dark_mode<S: PersistenceStore + ?Sized>(store: &S) -> Result<bool> {
    Ok(store.get(Scope::Durable, DARK_MODE_KEY)?.as_deref() == Some("true"))
}

/// Persist the theme flag.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
pub fn save_dark_mode<S: PersistenceStore + ?Sized>(store: &mut S, dark: bool) -> Result<()> {
    store.set(
        Scope::Durable,
        DARK_MODE_KEY,
        if dark { "true" } else { "false" },
    )
}

/// Load the persisted session identity, if a live one exists.
///
/// # Errors
///
/// Returns [`Error::CorruptValue`] if the stored JSON cannot be decoded, or
/// a storage error if the store cannot be read.
pub fn load_session<S: PersistenceStore + ?Sized>(store: &S) -> Result<Option<Session>> {
    let Some(raw) = store.get(Scope::Session, CURRENT_USER_KEY)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| Error::CorruptValue {
            key: CURRENT_USER_KEY,
            source,
        })
}

/// Persist the session identity.
///
/// # Errors
///
/// Returns an error if serialization or the store write fails.
pub fn save_session<S: PersistenceStore + ?Sized>(store: &mut S, session: &Session) -> Result<()> {
    let raw = serde_json::to_string(session)?;
    store.set(Scope::Session, CURRENT_USER_KEY, &raw)
}

/// Forget the session identity.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
pub fn clear_session<S: PersistenceStore + ?Sized>(store: &mut S) -> Result<()> {
    store.remove(Scope::Session, CURRENT_USER_KEY)
}

/// `SQLite`-backed key/value store.
///
/// Durable values live in `entries`; session values live in
/// `session_entries` with an expiry that slides forward on every read.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
    /// How long a session value lives without being read.
    idle_timeout: Duration,
}

impl Storage {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// initializes the schema, and purges expired session values.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>, idle_timeout: Duration) -> Result<Self> {
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

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")?;
        migrations::initialize_schema(&conn)?;

        let storage = Self {
            path,
            conn,
            idle_timeout,
        };
        storage.purge_expired()?;

        info!("Database opened at {}", storage.path.display());
        Ok(storage)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(idle_timeout: Duration) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
            idle_timeout,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete session values whose expiry has passed.
    ///
    /// Returns the number of values removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn purge_expired(&self) -> Result<usize> {
        let affected = self.conn.execute(
            "DELETE FROM session_entries WHERE expires_at <= ?1",
            [timestamp(Utc::now())],
        )?;
        if affected > 0 {
            debug!("Purged {} expired session values", affected);
        }
        Ok(affected)
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> String {
        timestamp(now + self.idle_timeout)
    }
}

impl PersistenceStore for Storage {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>> {
        match scope {
            Scope::Durable => Ok(self
                .conn
                .query_row("SELECT value FROM entries WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?),
            Scope::Session => {
                let now = Utc::now();
                let value: Option<String> = self
                    .conn
                    .query_row(
                        "SELECT value FROM session_entries WHERE key = ?1 AND expires_at > ?2",
                        params![key, timestamp(now)],
                        |row| row.get(0),
                    )
                    .optional()?;
                if value.is_some() {
                    self.conn.execute(
                        "UPDATE session_entries SET expires_at = ?2 WHERE key = ?1",
                        params![key, self.expiry_from(now)],
                    )?;
                }
                Ok(value)
            }
        }
    }

    fn set(&mut self, scope: Scope, key: &str, value: &str) -> Result<()> {
        match scope {
            Scope::Durable => self.conn.execute(
                r"
                INSERT INTO entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                ",
                params![key, value, timestamp(Utc::now())],
            )?,
            Scope::Session => self.conn.execute(
                "INSERT OR REPLACE INTO session_entries (key, value, expires_at) VALUES (?1, ?2, ?3)",
                params![key, value, self.expiry_from(Utc::now())],
            )?,
        };
        debug!("Wrote {} key '{}' ({} bytes)", scope, key, value.len());
        Ok(())
    }

    fn remove(&mut self, scope: Scope, key: &str) -> Result<()> {
        let table = match scope {
            Scope::Durable => "entries",
            Scope::Session => "session_entries",
        };
        self.conn
            .execute(&format!("DELETE FROM {table} WHERE key = ?1"), [key])?;
        debug!("Removed {} key '{}'", scope, key);
        Ok(())
    }
}

/// Fixed-width UTC timestamp, so text comparison in SQL orders correctly.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
