//! Route handler functions for all API endpoints.

use std::collections::HashMap;

use axum::body::Body;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use viab_agents::prompts::VISUALIZER_AGENT_ID;
use viab_agents::{collect_text, stream_text_response, AgentError, RunInput, StartedRun};
use viab_core::ids::{generate_session_id, generate_user_id};
use viab_core::types::{RunEventKind, SessionSummary, StoredRun, UserMemory};

use crate::error::ApiError;
use crate::state::AppState;
use crate::upload::{save_upload, FileInfo, UploadedFile};

/// Message used by `/analyze-image` when the form carries none.
pub const DEFAULT_ANALYZE_MESSAGE: &str = "Analyze the uploaded image";
/// User id used by `/analyze-image` when the form carries none.
pub const DEFAULT_USER_ID: &str = "default_user";

// =============================================================================
// Form extraction
// =============================================================================

/// Text fields plus an optional `file` part from a multipart or urlencoded
/// form. A request without a content type yields no fields.
#[derive(Debug, Default)]
pub struct FormFields {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl FormFields {
    /// Field value, or `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Parse a boolean field, defaulting when absent.
    pub fn flag(&self, name: &str, default: bool) -> Result<bool, ApiError> {
        match self.text(name).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) => match v.as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ApiError::BadRequest(format!(
                    "'{}' must be true or false, got '{}'",
                    name, v
                ))),
            },
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                // Browsers send an empty part when no file was chosen.
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            } else {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read field '{}': {}", name, e))
                })?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }
}

impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);

        match content_type.as_deref() {
            None => Ok(Self::default()),
            Some(ct) if ct.starts_with("multipart/form-data") => {
                let multipart = Multipart::from_request(req, state)
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                Self::from_multipart(multipart).await
            }
            Some(ct) if ct.starts_with("application/x-www-form-urlencoded") => {
                let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                Ok(Self { fields, file: None })
            }
            Some(other) => Err(ApiError::BadRequest(format!(
                "Unsupported content type '{}', expected a form",
                other
            ))),
        }
    }
}

// =============================================================================
// Query parameter types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RunParams {
    pub agent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserParams {
    pub user_id: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

/// Body of a non-streaming `/runs` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    pub content: String,
    pub content_type: String,
    pub event: String,
    pub agent_id: String,
    pub run_id: String,
    pub session_id: String,
    pub user_id: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeImageResponse {
    pub status: String,
    pub message: String,
    pub file_info: FileInfo,
    pub analysis: String,
    pub user_id: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub llm: String,
    pub agents: usize,
    pub total_runs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentInfo {
    pub agent_id: String,
    pub name: String,
    pub description: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentsResponse {
    pub agents: Vec<AgentInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionRunsResponse {
    pub session_id: String,
    pub runs: Vec<StoredRun>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemoriesResponse {
    pub user_id: String,
    pub memories: Vec<UserMemory>,
}

// =============================================================================
// Run endpoints
// =============================================================================

/// POST /runs?agent_id= - run an agent on a form message.
///
/// With `stream=true` (the default) the body is the raw text chunks as the
/// model produces them. With `stream=false` a single JSON document is
/// returned once the run completes.
pub async fn create_run(
    State(state): State<AppState>,
    Query(params): Query<RunParams>,
    form: FormFields,
) -> Result<Response, ApiError> {
    let agent_id = params
        .agent_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("'agent_id' query parameter is required".to_string()))?;
    let agent = state.agents.get(&agent_id)?.clone();

    let stream = form.flag("stream", true)?;
    let user_id = form
        .text("user_id")
        .map(str::to_string)
        .unwrap_or_else(generate_user_id);
    let session_id = form
        .text("session_id")
        .map(str::to_string)
        .unwrap_or_else(generate_session_id);
    let message = form.text("message").unwrap_or_default().to_string();
    let session_header = stream
        .then(|| header_value("x-session-id", &session_id))
        .transpose()?;

    let mut input = RunInput::new(message, &user_id, &session_id);
    if let Some(file) = &form.file {
        let (path, _) = save_upload(&state.upload_dir, &user_id, file).await?;
        input.images.push(path);
    }
    if input.message.trim().is_empty()
        && (input.images.is_empty() || agent.spec().image_prompt.is_none())
    {
        return Err(AgentError::EmptyMessage.into());
    }

    info!(agent_id = %agent_id, user_id = %user_id, session_id = %session_id, stream, "Run requested");

    let StartedRun { started, mut events } = agent.start(input).await?;
    let run_id = started.run_id.clone();

    if let Some(session_header) = session_header {
        let chunks = stream_text_response(events).map(move |chunk| {
            chunk.inspect_err(|e| warn!(agent_id = %agent_id, error = %e, "Run stream aborted"))
        });
        let mut response = Response::new(Body::from_stream(chunks));
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert("x-session-id", session_header);
        headers.insert("x-run-id", header_value("x-run-id", &run_id)?);
        return Ok(response);
    }

    let mut content = String::new();
    while let Some(event) = events.next().await {
        let event = event?;
        if event.event == RunEventKind::RunResponseContent {
            if let Some(text) = event.content {
                content.push_str(&text);
            }
        }
    }

    Ok(Json(RunResponse {
        content,
        content_type: "str".to_string(),
        event: "RunResponse".to_string(),
        agent_id: agent.id().to_string(),
        run_id,
        session_id,
        user_id,
        model: agent.settings().model.clone(),
        created_at: started.created_at,
    })
    .into_response())
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value)
        .map_err(|_| ApiError::BadRequest(format!("'{}' contains invalid characters", name)))
}

/// POST /analyze-image - save an uploaded image and run the visualizer on it.
///
/// A failing agent run is reported in `analysis`; the status stays 200.
/// A blank `session_id` is replaced by a generated one, which the response echoes.
pub async fn analyze_image(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<AnalyzeImageResponse>, ApiError> {
    let file = form
        .file
        .as_ref()
        .ok_or_else(|| ApiError::UnprocessableEntity("Field 'file' is required".to_string()))?;
    let message = form.text("message").unwrap_or(DEFAULT_ANALYZE_MESSAGE).to_string();
    let user_id = form.text("user_id").unwrap_or(DEFAULT_USER_ID).to_string();
    let session_id = form
        .text("session_id")
        .map(str::to_string)
        .unwrap_or_else(generate_session_id);

    let (path, file_info) = save_upload(&state.upload_dir, &user_id, file).await?;

    let agent = state.agents.get(VISUALIZER_AGENT_ID)?;
    let input = RunInput::new(&message, &user_id, &session_id).with_image(path);
    let analysis = match collect_text(agent.run(input)).await {
        Ok(text) => text,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Image analysis failed");
            format!("Analysis failed: {}", e)
        }
    };

    Ok(Json(AnalyzeImageResponse {
        status: "success".to_string(),
        message,
        file_info,
        analysis,
        user_id,
        session_id,
    }))
}

// =============================================================================
// Read-only endpoints
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        llm: state.llm_name.clone(),
        agents: state.agents.len(),
        total_runs: state.runs.count()?,
    }))
}

/// GET /agents - list registered agents.
pub async fn agents(State(state): State<AppState>) -> Json<AgentsResponse> {
    let agents = state
        .agents
        .iter()
        .map(|agent| AgentInfo {
            agent_id: agent.id().to_string(),
            name: agent.spec().name.to_string(),
            description: agent.spec().description.to_string(),
            model: agent.settings().model.clone(),
        })
        .collect();
    Json(AgentsResponse { agents })
}

/// GET /sessions - stored sessions, most recent first.
pub async fn sessions(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let user_id = params.user_id.filter(|u| !u.is_empty());
    let sessions = state.runs.list_sessions(user_id.as_deref())?;
    Ok(Json(SessionsResponse { sessions }))
}

/// GET /sessions/{session_id}/runs - all runs of one session, oldest first.
pub async fn session_runs(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionRunsResponse>, ApiError> {
    let runs = state.runs.list_for_session(&session_id)?;
    if runs.is_empty() {
        return Err(ApiError::NotFound(format!("Session not found: {}", session_id)));
    }
    Ok(Json(SessionRunsResponse { session_id, runs }))
}

/// GET /memories?user_id= - facts remembered about a user.
pub async fn memories(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<Json<MemoriesResponse>, ApiError> {
    let user_id = params
        .user_id
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("'user_id' query parameter is required".to_string()))?;
    let memories = state.memories.list(&user_id)?;
    Ok(Json(MemoriesResponse { user_id, memories }))
}

/// GET /ui - serve the self-contained chat page.
pub async fn ui() -> impl IntoResponse {
    Html(viab_ui::chat::CHAT_HTML)
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("No such endpoint".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn form(pairs: &[(&str, &str)]) -> FormFields {
        FormFields {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            file: None,
        }
    }

    #[test]
    fn test_text_ignores_blank_values() {
        let f = form(&[("user_id", "  "), ("message", "hi")]);
        assert_eq!(f.text("user_id"), None);
        assert_eq!(f.text("message"), Some("hi"));
        assert_eq!(f.text("missing"), None);
    }

    #[test]
    fn test_flag_parsing() {
        assert!(form(&[]).flag("stream", true).unwrap());
        assert!(!form(&[("stream", "False")]).flag("stream", true).unwrap());
        assert!(form(&[("stream", "1")]).flag("stream", false).unwrap());
        let err = form(&[("stream", "maybe")]).flag("stream", true).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
