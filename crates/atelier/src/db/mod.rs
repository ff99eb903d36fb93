//! Database module for persistent storage.
//!
//! Uses rusqlite (SQLite) with a thread-safe `Database` handle.
//! All access is serialized through a `Mutex<Connection>`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

pub mod catalog_repo;
pub mod commission_repo;
pub mod error;
pub mod goal_repo;
pub mod hooks;
pub mod migrations;
pub mod site_repo;
pub mod visual_repo;

pub use error::DatabaseError;
pub use hooks::FileReleaseHook;

/// Thread-safe database handle wrapping a single rusqlite connection.
///
/// Cloning is cheap (inner `Arc`). All access is serialized through
/// a `Mutex`, which is fine for SQLite (which serializes writes anyway).
/// Registered file-release hooks are shared between clones.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    hooks: Arc<Mutex<Vec<Arc<dyn FileReleaseHook>>>>,
}

impl Database {
    /// Opens (or creates) the database at the given path and runs all
    /// pending migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        log::info!("Database opened at {}", path.display());

        Ok(Self::from_connection(conn))
    }

    /// Opens an in-memory database for testing. Runs all migrations.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            hooks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Provides locked access to the underlying connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    /// Registers a hook notified whenever a repository drops its reference
    /// to a stored file.
    pub fn register_file_hook(&self, hook: Arc<dyn FileReleaseHook>) -> Result<(), DatabaseError> {
        let mut hooks = self.hooks.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        hooks.push(hook);
        Ok(())
    }

    /// Notifies every registered hook that `relative_path` is no longer
    /// referenced. Must be called after the row change has been committed.
    pub(crate) fn release_file(&self, relative_path: &str) {
        let hooks = match self.hooks.lock() {
            Ok(hooks) => hooks.clone(),
            Err(_) => {
                log::warn!("File hook registry poisoned; {} not released", relative_path);
                return;
            }
        };
        for hook in hooks {
            hook.file_released(relative_path);
        }
    }
}

/// Returns the canonical database path: `~/.atelier/data/atelier.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".atelier").join("data").join("atelier.db"))
}
