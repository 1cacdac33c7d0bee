//! Error types for agent runs and LLM clients.

use viab_core::error::ViabError;

/// Errors from an agent run.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("no API key configured for {0}")]
    MissingApiKey(&'static str),
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("LLM returned {status}: {message}")]
    Http { status: u16, message: String },
    #[error("failed to decode LLM response: {0}")]
    Decode(String),
    #[error("LLM error: {0}")]
    Llm(String),
    #[error("failed to read attachment {path}: {source}")]
    Attachment {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<ViabError> for AgentError {
    fn from(err: ViabError) -> Self {
        AgentError::Storage(err.to_string())
    }
}

impl From<AgentError> for ViabError {
    fn from(err: AgentError) -> Self {
        ViabError::Agent(err.to_string())
    }
}
