use std::path::PathBuf;
use thiserror::Error;

/// Errors from the persistence layer.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create database directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration v{version} ({description}) failed: {source}")]
    Migration {
        version: u32,
        description: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// A writer panicked while holding the connection.
    #[error("Database lock poisoned")]
    LockPoisoned,
}
