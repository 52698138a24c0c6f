//! SQLite database handle with connection-per-call and schema setup.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::info;

use crate::error::DatabaseError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS mails (
    id INTEGER PRIMARY KEY,
    sender TEXT NOT NULL,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    snippet TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    important BOOLEAN NOT NULL
);";

/// Handle to a SQLite database file.
///
/// Holds no connection. Every operation opens its own connection and drops
/// it before returning, so nothing is shared between calls except the file.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Open a fresh connection. Closed when the returned value is dropped.
    pub fn connect(&self) -> Result<Connection, DatabaseError> {
        Connection::open(&self.path).map_err(|e| DatabaseError::Open {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Create the mail table if absent. Safe to call on every startup.
    pub fn init_schema(&self) -> Result<(), DatabaseError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Open {
                path: self.path.display().to_string(),
                reason: format!("Failed to create directory {}: {}", parent.display(), e),
            })?;
        }

        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %self.path.display(), "Mail schema ready");
        Ok(())
    }
}
