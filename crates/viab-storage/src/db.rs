//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex for thread-safe access.
//! Configures WAL mode and recommended PRAGMAs on initialization.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use viab_core::config::StorageConfig;
use viab_core::error::ViabError;

use crate::migrations;

/// Names of the tables that hold runs and user memories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub runs: String,
    pub memories: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}

impl From<&StorageConfig> for TableNames {
    fn from(config: &StorageConfig) -> Self {
        Self {
            runs: config.runs_table.clone(),
            memories: config.memory_table.clone(),
        }
    }
}

/// Thread-safe SQLite database wrapper.
pub struct Database {
    conn: Mutex<Connection>,
    tables: TableNames,
}

impl Database {
    /// Open (or create) a database at the given path and run migrations.
    ///
    /// Table names must already be validated identifiers; they are
    /// interpolated into SQL.
    pub fn new(path: &Path, tables: TableNames) -> Result<Self, ViabError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| ViabError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| ViabError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
            tables,
        };
        db.with_conn(|conn| migrations::run_migrations(conn, &db.tables))?;
        Ok(db)
    }

    /// Open an in-memory database with the default table names (for testing).
    pub fn in_memory() -> Result<Self, ViabError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ViabError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
            tables: TableNames::default(),
        };
        db.with_conn(|conn| migrations::run_migrations(conn, &db.tables))?;
        Ok(db)
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ViabError>
    where
        F: FnOnce(&Connection) -> Result<T, ViabError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ViabError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("tables", &self.tables)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .map_err(|e| ViabError::Storage(e.to_string()))
        })
        .unwrap()
    }

    #[test]
    fn test_in_memory_database_has_default_tables() {
        let db = Database::in_memory().unwrap();
        assert_eq!(count(&db, "shared_storage"), 0);
        assert_eq!(count(&db, "shared_memories"), 0);
    }

    #[test]
    fn test_file_database_with_custom_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("viab.db");
        let tables = TableNames {
            runs: "agent_runs".to_string(),
            memories: "agent_memories".to_string(),
        };
        let db = Database::new(&path, tables).unwrap();
        assert!(path.exists());
        assert_eq!(count(&db, "agent_runs"), 0);
        assert_eq!(count(&db, "agent_memories"), 0);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viab.db");
        drop(Database::new(&path, TableNames::default()).unwrap());
        let db = Database::new(&path, TableNames::default()).unwrap();
        assert_eq!(count(&db, "schema_migrations"), 1);
    }
}
