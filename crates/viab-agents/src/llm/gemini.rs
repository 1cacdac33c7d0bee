//! Gemini REST client with server-sent-event streaming.
//!
//! Calls `{base}/{model}:streamGenerateContent?alt=sse`; every SSE `data:`
//! payload is a partial `GenerateContentResponse` whose candidate text parts
//! become one delta each.

use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use viab_core::types::{ChatTurn, Role};

use super::{LlmClient, LlmRequest, TextStream};
use crate::error::AgentError;

/// Agent backend that talks to the Gemini HTTP API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Option<Duration>,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    /// Limit the wait for response headers and for each body chunk after
    /// that. A reply that keeps producing chunks may run for any length.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn stream_url(&self, model: &str) -> String {
        format!("{}/{}:streamGenerateContent?alt=sse", self.base_url, model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(level = "debug", skip_all, fields(model = %request.model))]
    async fn stream(&self, request: LlmRequest) -> Result<TextStream, AgentError> {
        let url = self.stream_url(&request.model);
        let body = GenerateContentRequest::from_request(&request);

        let send = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send();
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, send).await.map_err(|_| {
                AgentError::Request(format!(
                    "Gemini API did not respond within {}ms",
                    limit.as_millis()
                ))
            })?,
            None => send.await,
        }
        .map_err(|err| AgentError::Request(format!("Gemini API request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        debug!("Gemini stream opened");
        Ok(Box::pin(decode_sse_stream(response.bytes_stream(), self.timeout)))
    }
}

/// Turn a raw SSE byte stream into text deltas.
///
/// With `idle` set, the stream fails once no chunk has arrived for that long.
pub fn decode_sse_stream<S, B, E>(
    bytes: S,
    idle: Option<Duration>,
) -> impl Stream<Item = Result<String, AgentError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut decoder = SseDecoder::default();
        loop {
            let next = match idle {
                Some(limit) => tokio::time::timeout(limit, bytes.next()).await.map_err(|_| {
                    AgentError::Request(format!(
                        "Gemini stream stalled: no data for {}ms",
                        limit.as_millis()
                    ))
                })?,
                None => bytes.next().await,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|e| AgentError::Request(format!("Gemini stream interrupted: {e}")))?;
            for data in decoder.push(chunk.as_ref()) {
                for text in parse_event_data(&data)? {
                    yield text;
                }
            }
        }
        if let Some(data) = decoder.finish() {
            for text in parse_event_data(&data)? {
                yield text;
            }
        }
    }
}

/// Incremental decoder for `text/event-stream` bodies.
///
/// Yields the joined `data:` payload of each event once its terminating
/// blank line arrives. Other fields (`event:`, `id:`, comments) are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.feed_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).into_owned();
            let line = line.strip_suffix('\r').unwrap_or(&line).to_string();
            self.feed_line(&line);
        }
        self.dispatch()
    }

    fn feed_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.data_lines.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data_lines).join("\n"))
    }
}

/// Extract candidate text parts from one streamed response chunk.
pub fn parse_event_data(data: &str) -> Result<Vec<String>, AgentError> {
    let chunk: GenerateContentResponse = serde_json::from_str(data)
        .map_err(|e| AgentError::Decode(format!("{e}: {data}")))?;

    if let Some(error) = chunk.error {
        return Err(AgentError::Llm(error.describe(data)));
    }

    let texts: Vec<String> = chunk
        .candidates
        .unwrap_or_default()
        .into_iter()
        .take(1)
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .filter_map(|part| part.text)
        .filter(|text| !text.is_empty())
        .collect();

    if texts.is_empty() {
        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(AgentError::Llm(format!("prompt blocked: {reason}")));
        }
    }
    Ok(texts)
}

fn map_http_error(status: StatusCode, body: &str) -> AgentError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| wrapper.error.describe(body))
        .unwrap_or_else(|_| body.to_string());
    AgentError::Http {
        status: status.as_u16(),
        message,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    fn from_request(request: &LlmRequest) -> Self {
        let mut contents: Vec<Content> = request.history.iter().map(Content::from_turn).collect();

        let mut parts = Vec::with_capacity(1 + request.images.len());
        if !request.message.trim().is_empty() {
            parts.push(Part::Text {
                text: request.message.clone(),
            });
        }
        for image in &request.images {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: BASE64_STANDARD.encode(&image.data),
                },
            });
        }
        contents.push(Content {
            role: Some("user".to_string()),
            parts,
        });

        let system_instruction = (!request.system_instruction.is_empty()).then(|| Content {
            role: None,
            parts: vec![Part::Text {
                text: request.system_instruction.clone(),
            }],
        });

        Self {
            contents,
            system_instruction,
            generation_config: request
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

impl Content {
    fn from_turn(turn: &ChatTurn) -> Self {
        let role = match turn.role {
            Role::User => "user",
            Role::Model => "model",
        };
        Self {
            role: Some(role.to_string()),
            parts: vec![Part::Text {
                text: turn.text.clone(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

impl ErrorBody {
    fn describe(&self, raw: &str) -> String {
        let msg = self.message.clone().unwrap_or_else(|| raw.to_string());
        match self.status.as_deref() {
            Some(status) if !status.is_empty() => format!("{status}: {msg}"),
            _ => msg,
        }
    }
}
