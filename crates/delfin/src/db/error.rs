//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from database operations. Surfaced to the user as a storage failure.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Creating the database directory failed.
    #[error("Cannot create '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    #[error("Database lock poisoned")]
    LockPoisoned,
}
