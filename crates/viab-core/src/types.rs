//! Domain types shared across crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of event emitted while an agent run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEventKind {
    RunStarted,
    RunResponseContent,
    RunCompleted,
}

impl std::fmt::Display for RunEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunEventKind::RunStarted => "RunStarted",
            RunEventKind::RunResponseContent => "RunResponseContent",
            RunEventKind::RunCompleted => "RunCompleted",
        };
        f.write_str(s)
    }
}

/// One incremental unit of a single agent run.
///
/// Only `RunResponseContent` events carry `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub event: RunEventKind,
    pub agent_id: String,
    pub run_id: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RunEvent {
    pub fn new(kind: RunEventKind, agent_id: &str, run_id: &str, session_id: &str) -> Self {
        Self {
            event: kind,
            agent_id: agent_id.to_string(),
            run_id: run_id.to_string(),
            session_id: session_id.to_string(),
            content: None,
            created_at: Utc::now(),
        }
    }

    pub fn content(agent_id: &str, run_id: &str, session_id: &str, text: String) -> Self {
        Self {
            content: Some(text),
            ..Self::new(RunEventKind::RunResponseContent, agent_id, run_id, session_id)
        }
    }
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single prior message replayed to the model as history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// A completed run as persisted in session storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRun {
    pub run_id: String,
    pub agent_id: String,
    pub user_id: String,
    pub session_id: String,
    pub message: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

/// Per-session rollup of stored runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: String,
    /// Distinct agents that ran in this session, sorted.
    pub agent_ids: Vec<String>,
    pub run_count: u64,
    pub first_run_at: DateTime<Utc>,
    pub last_run_at: DateTime<Utc>,
}

/// A fact remembered about a user, keyed by a short name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMemory {
    pub user_id: String,
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
