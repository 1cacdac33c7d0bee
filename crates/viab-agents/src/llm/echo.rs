use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;

use super::{LlmClient, LlmRequest, SharedLlmClient, TextStream};
use crate::error::AgentError;

/// Stand-in used when no model backend is configured.
#[derive(Debug, Default, Clone)]
pub struct EchoLlmClient;

impl EchoLlmClient {
    pub fn shared() -> SharedLlmClient {
        Arc::new(Self)
    }
}

#[async_trait]
impl LlmClient for EchoLlmClient {
    fn name(&self) -> &str {
        "echo"
    }

    async fn stream(&self, request: LlmRequest) -> Result<TextStream, AgentError> {
        let mut chunks = vec![
            "[stubbed agent response]\n".to_string(),
            format!("I received: {}\n", request.message),
        ];
        if !request.images.is_empty() {
            chunks.push(format!("Attached images: {}\n", request.images.len()));
        }
        chunks.push("Next step: set GEMINI_API_KEY to connect a model.".to_string());
        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }
}
