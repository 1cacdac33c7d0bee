//! Repository implementations for SQLite-backed persistence.
//!
//! `RunRepository` stores completed agent runs keyed by user and session;
//! `MemoryRepository` stores per-user key/value memories.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Row;

use viab_core::error::ViabError;
use viab_core::types::{SessionSummary, StoredRun, UserMemory};

use crate::db::Database;

fn storage_err(e: rusqlite::Error) -> ViabError {
    ViabError::Storage(e.to_string())
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Repository for completed agent runs.
#[derive(Debug, Clone)]
pub struct RunRepository {
    db: Arc<Database>,
}

impl RunRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a completed run.
    pub fn save(&self, run: &StoredRun) -> Result<(), ViabError> {
        let table = &self.db.tables().runs;
        self.db.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {table} (run_id, agent_id, user_id, session_id, message, response, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                ),
                rusqlite::params![
                    run.run_id,
                    run.agent_id,
                    run.user_id,
                    run.session_id,
                    run.message,
                    run.response,
                    run.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| ViabError::Storage(format!("Failed to save run: {}", e)))?;
            Ok(())
        })
    }

    /// The most recent `limit` runs of a session, oldest first.
    pub fn recent_for_session(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredRun>, ViabError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let table = &self.db.tables().runs;
        let mut runs = self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT run_id, agent_id, user_id, session_id, message, response, created_at
                     FROM {table} WHERE session_id = ?1 ORDER BY seq DESC LIMIT ?2"
                ))
                .map_err(storage_err)?;
            let rows = stmt
                .query_map(rusqlite::params![session_id, limit as i64], row_to_run)
                .map_err(storage_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(storage_err)
        })?;
        runs.reverse();
        Ok(runs)
    }

    /// All runs of a session in the order they were stored.
    pub fn list_for_session(&self, session_id: &str) -> Result<Vec<StoredRun>, ViabError> {
        let table = &self.db.tables().runs;
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT run_id, agent_id, user_id, session_id, message, response, created_at
                     FROM {table} WHERE session_id = ?1 ORDER BY seq ASC"
                ))
                .map_err(storage_err)?;
            let rows = stmt
                .query_map(rusqlite::params![session_id], row_to_run)
                .map_err(storage_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(storage_err)
        })
    }

    /// Session rollups, most recently active first. Filter by user if given.
    pub fn list_sessions(&self, user_id: Option<&str>) -> Result<Vec<SessionSummary>, ViabError> {
        let table = &self.db.tables().runs;
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT session_id, user_id, GROUP_CONCAT(DISTINCT agent_id), COUNT(*),
                            MIN(created_at), MAX(created_at), MAX(seq) AS last_seq
                     FROM {table}
                     WHERE (?1 IS NULL OR user_id = ?1)
                     GROUP BY session_id, user_id
                     ORDER BY last_seq DESC"
                ))
                .map_err(storage_err)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id], |row| {
                    let agents: String = row.get(2)?;
                    let mut agent_ids: Vec<String> =
                        agents.split(',').map(str::to_string).collect();
                    agent_ids.sort();
                    Ok(SessionSummary {
                        session_id: row.get(0)?,
                        user_id: row.get(1)?,
                        agent_ids,
                        run_count: row.get::<_, i64>(3)? as u64,
                        first_run_at: from_millis(row.get(4)?),
                        last_run_at: from_millis(row.get(5)?),
                    })
                })
                .map_err(storage_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(storage_err)
        })
    }

    /// Total number of stored runs.
    pub fn count(&self) -> Result<u64, ViabError> {
        let table = &self.db.tables().runs;
        self.db.with_conn(|conn| {
            let n: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .map_err(storage_err)?;
            Ok(n as u64)
        })
    }
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<StoredRun> {
    Ok(StoredRun {
        run_id: row.get(0)?,
        agent_id: row.get(1)?,
        user_id: row.get(2)?,
        session_id: row.get(3)?,
        message: row.get(4)?,
        response: row.get(5)?,
        created_at: from_millis(row.get(6)?),
    })
}

/// Repository for per-user memories.
#[derive(Debug, Clone)]
pub struct MemoryRepository {
    db: Arc<Database>,
}

impl MemoryRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a memory or replace the value stored under the same key.
    pub fn upsert(&self, user_id: &str, key: &str, value: &str) -> Result<(), ViabError> {
        let table = &self.db.tables().memories;
        self.db.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {table} (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value,
                                                            updated_at = excluded.updated_at"
                ),
                rusqlite::params![user_id, key, value, Utc::now().timestamp_millis()],
            )
            .map_err(|e| ViabError::Storage(format!("Failed to save memory: {}", e)))?;
            Ok(())
        })
    }

    /// All memories of a user, sorted by key.
    pub fn list(&self, user_id: &str) -> Result<Vec<UserMemory>, ViabError> {
        let table = &self.db.tables().memories;
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT user_id, key, value, updated_at FROM {table}
                     WHERE user_id = ?1 ORDER BY key ASC"
                ))
                .map_err(storage_err)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id], |row| {
                    Ok(UserMemory {
                        user_id: row.get(0)?,
                        key: row.get(1)?,
                        value: row.get(2)?,
                        updated_at: from_millis(row.get(3)?),
                    })
                })
                .map_err(storage_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(storage_err)
        })
    }
}
