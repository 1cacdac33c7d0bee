//! LLM client seam.
//!
//! Agents talk to a model only through [`LlmClient`], which streams text
//! deltas for one request. `GeminiClient` is the production backend,
//! `EchoLlmClient` is the keyless fallback, and `ScriptedLlmClient` drives
//! tests.

pub mod echo;
pub mod gemini;
pub mod scripted;

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;

use viab_core::config::ModelConfig;
use viab_core::types::ChatTurn;

use crate::error::AgentError;

pub use echo::EchoLlmClient;
pub use gemini::GeminiClient;
pub use scripted::ScriptedLlmClient;

/// Stream of text deltas produced by a model.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AgentError>> + Send>>;

pub type SharedLlmClient = Arc<dyn LlmClient>;

/// Inline image sent with the user message.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePart {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Everything a model needs for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub model: String,
    pub system_instruction: String,
    /// Earlier turns, oldest first.
    pub history: Vec<ChatTurn>,
    pub message: String,
    pub images: Vec<ImagePart>,
    pub temperature: Option<f32>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &str;

    /// Start a completion and stream its text deltas in order.
    async fn stream(&self, request: LlmRequest) -> Result<TextStream, AgentError>;
}

/// Build the configured client.
///
/// Without an API key this falls back to the echo client when
/// `fallback_to_echo` is set, and fails otherwise.
pub fn build_llm_client(config: &ModelConfig) -> Result<SharedLlmClient, AgentError> {
    match config.api_key.as_deref() {
        Some(key) => {
            let client = GeminiClient::new(key, &config.base_url)
                .with_timeout(Duration::from_secs(config.request_timeout_secs));
            Ok(Arc::new(client))
        }
        None if config.fallback_to_echo => {
            tracing::warn!("No Gemini API key configured, falling back to EchoLlmClient");
            Ok(EchoLlmClient::shared())
        }
        None => Err(AgentError::MissingApiKey("Gemini")),
    }
}
