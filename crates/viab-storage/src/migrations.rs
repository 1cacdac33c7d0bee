//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use viab_core::error::ViabError;

use crate::db::TableNames;

/// Run all pending database migrations.
///
/// Table creation is idempotent and always executed, so renaming a table in
/// the configuration yields a fresh empty table on next start.
pub fn run_migrations(conn: &Connection, tables: &TableNames) -> Result<(), ViabError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ViabError::Storage(format!("Failed to create migrations table: {}", e)))?;

    create_tables(conn, tables)?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ViabError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        conn.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema')",
            [],
        )
        .map_err(|e| ViabError::Storage(format!("Failed to record migration: {}", e)))?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

fn create_tables(conn: &Connection, tables: &TableNames) -> Result<(), ViabError> {
    let runs = &tables.runs;
    let memories = &tables.memories;
    let sql = format!(
        "
        CREATE TABLE IF NOT EXISTS {runs} (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id      TEXT NOT NULL UNIQUE,
            agent_id    TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            session_id  TEXT NOT NULL,
            message     TEXT NOT NULL DEFAULT '',
            response    TEXT NOT NULL DEFAULT '',
            created_at  INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{runs}_session ON {runs}(session_id, seq);
        CREATE INDEX IF NOT EXISTS idx_{runs}_user ON {runs}(user_id);

        CREATE TABLE IF NOT EXISTS {memories} (
            user_id     TEXT NOT NULL,
            key         TEXT NOT NULL,
            value       TEXT NOT NULL,
            updated_at  INTEGER NOT NULL,
            PRIMARY KEY (user_id, key)
        );
        "
    );
    conn.execute_batch(&sql)
        .map_err(|e| ViabError::Storage(format!("Failed to create tables: {}", e)))
}
