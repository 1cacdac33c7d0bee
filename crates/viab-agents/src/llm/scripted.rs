use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use super::{LlmClient, LlmRequest, TextStream};
use crate::error::AgentError;

#[derive(Debug, Clone)]
enum Script {
    Chunks(Vec<String>),
    FailOnStart(String),
    FailAfter(Vec<String>, String),
}

/// Deterministic client for tests.
///
/// Replays the same script on every call and records each request.
#[derive(Debug, Clone)]
pub struct ScriptedLlmClient {
    script: Script,
    requests: Arc<Mutex<Vec<LlmRequest>>>,
}

impl ScriptedLlmClient {
    /// Stream the given chunks on every call.
    pub fn with_chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_script(Script::Chunks(chunks.into_iter().map(Into::into).collect()))
    }

    /// Fail before any chunk is produced.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::from_script(Script::FailOnStart(message.into()))
    }

    /// Stream `chunks`, then fail mid-stream.
    pub fn failing_after<I, S>(chunks: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_script(Script::FailAfter(
            chunks.into_iter().map(Into::into).collect(),
            message.into(),
        ))
    }

    fn from_script(script: Script) -> Self {
        Self {
            script,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: LlmRequest) -> Result<TextStream, AgentError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        match &self.script {
            Script::Chunks(chunks) => {
                let items: Vec<Result<String, AgentError>> =
                    chunks.iter().cloned().map(Ok).collect();
                Ok(Box::pin(stream::iter(items)))
            }
            Script::FailOnStart(message) => Err(AgentError::Llm(message.clone())),
            Script::FailAfter(chunks, message) => {
                let mut items: Vec<Result<String, AgentError>> =
                    chunks.iter().cloned().map(Ok).collect();
                items.push(Err(AgentError::Llm(message.clone())));
                Ok(Box::pin(stream::iter(items)))
            }
        }
    }
}
