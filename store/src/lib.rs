#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Store
//!
//! The single-file embedded relational database (§4.1). Every other
//! component in the workspace treats a [`Store`] as the sole source of
//! durable truth; the store holds no back-references to its callers.
//!
//! A [`Store`] wraps one [`rusqlite::Connection`] behind a [`parking_lot`]
//! mutex — call sites are synchronous and short-lived (§5: writes are
//! transactional, long scans must not hold a write transaction), so a single
//! connection serialised by a mutex is simpler than a pool and matches the
//! reference implementation's single-file-database model.

mod admin;
mod betting;
pub mod error;
mod fixtures;
mod ingestion;
mod json;
mod migrations;
mod models;
mod trading;

pub use admin::{BackupCollaborator, FileBackupCollaborator, ResetReport};
pub use betting::BankrollStats;
pub use error::{Result, StoreError};

use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Handle to the embedded database. Cheap to clone-by-reference (`&Store`);
/// internally synchronised, so a single instance can be shared across
/// worker threads.
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish_non_exhaustive()
    }
}

impl Store {
    /// Opens (creating if absent) the database file at `path` and runs the
    /// migration ladder to completion.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(&path)?;
        Self::from_connection(conn, Some(path.as_ref().to_path_buf()))
    }

    /// An ephemeral, migrated, in-memory database — the backing for every
    /// unit and integration test in this workspace.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        migrations::migrate(&conn)?;
        Ok(Self { conn: Mutex::new(conn), path })
    }

    /// Runs `f` with exclusive access to the underlying connection. Internal
    /// helper; every public method goes through this rather than exposing
    /// the connection directly, so row-mapping stays colocated with schema
    /// knowledge.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }
}
