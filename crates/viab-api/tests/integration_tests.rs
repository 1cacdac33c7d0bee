//! Integration tests for the VIAB API.
//!
//! Each test builds its own router over an in-memory database, a temporary
//! upload directory and a scripted model client.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use viab_agents::llm::ScriptedLlmClient;
use viab_agents::prompts::VISUALIZER_IMAGE_PROMPT;
use viab_api::create_router;
use viab_api::handlers::{
    AgentsResponse, AnalyzeImageResponse, HealthResponse, MemoriesResponse, RunResponse,
    SessionRunsResponse, SessionsResponse,
};
use viab_api::state::AppState;
use viab_core::config::ViabConfig;
use viab_storage::Database;

// =============================================================================
// Helpers
// =============================================================================

const BOUNDARY: &str = "viab-test-boundary";

fn make_state(llm: ScriptedLlmClient, upload_dir: &Path) -> AppState {
    let mut config = ViabConfig::default();
    config.uploads.dir = upload_dir.display().to_string();
    AppState::new(config, Arc::new(llm), Database::in_memory().unwrap())
}

fn make_app(llm: ScriptedLlmClient, upload_dir: &Path) -> axum::Router {
    create_router(make_state(llm, upload_dir))
}

/// Multipart body with text fields and an optional `file` part.
fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_post(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::post(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 16 * 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

// =============================================================================
// GET endpoints
// =============================================================================

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["x"]), dir.path());
    let resp = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let health: HealthResponse = body_json(resp).await;
    assert_eq!(health.status, "healthy");
    assert_eq!(health.llm, "scripted");
    assert_eq!(health.agents, 3);
    assert_eq!(health.total_runs, 0);
}

#[tokio::test]
async fn test_agents_lists_builtins() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["x"]), dir.path());
    let resp = app.oneshot(get("/agents")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let agents: AgentsResponse = body_json(resp).await;
    let ids: Vec<&str> = agents.agents.iter().map(|a| a.agent_id.as_str()).collect();
    assert_eq!(ids, vec!["boq_agent", "interview_agent", "visualizer_agent"]);
    assert!(agents.agents.iter().all(|a| a.model == "gemini-2.5-flash"));
}

#[tokio::test]
async fn test_ui_serves_chat_page() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["x"]), dir.path());
    let resp = app.oneshot(get("/ui")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains("Generate BOQ"));
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["x"]), dir.path());
    let resp = app.oneshot(get("/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_memories_requires_user_id() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["x"]), dir.path());
    let resp = app.oneshot(get("/memories")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert!(body["detail"].as_str().unwrap().contains("user_id"));
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["x"]), dir.path());
    let resp = app.oneshot(get("/sessions/nothing/runs")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// POST /runs
// =============================================================================

#[tokio::test]
async fn test_run_streams_raw_text() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(
        ScriptedLlmClient::with_chunks(["Hello! ", "", "What are you building?"]),
        dir.path(),
    );
    let resp = app
        .oneshot(form_post(
            "/runs?agent_id=interview_agent",
            "message=hi&user_id=u1&session_id=s1",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(resp.headers()["x-session-id"], "s1");
    assert_eq!(resp.headers()["x-run-id"].len(), 32);

    let text = String::from_utf8(body_bytes(resp).await).unwrap();
    assert_eq!(text, "Hello! What are you building?");
}

#[tokio::test]
async fn test_run_json_mode() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["a", "b"]), dir.path());
    let resp = app
        .oneshot(multipart_post(
            "/runs?agent_id=boq_agent",
            multipart_body(
                &[("message", "boq please"), ("stream", "false"), ("user_id", "u1")],
                None,
            ),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let run: RunResponse = body_json(resp).await;
    assert_eq!(run.content, "ab");
    assert_eq!(run.content_type, "str");
    assert_eq!(run.event, "RunResponse");
    assert_eq!(run.agent_id, "boq_agent");
    assert_eq!(run.user_id, "u1");
    assert_eq!(run.session_id.len(), 8);
    assert_eq!(run.model, "gemini-2.5-flash");
}

#[tokio::test]
async fn test_run_generates_missing_ids() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["ok"]), dir.path());
    let resp = app
        .oneshot(form_post(
            "/runs?agent_id=interview_agent",
            "message=hi&stream=false&user_id=&session_id=",
        ))
        .await
        .unwrap();
    let run: RunResponse = body_json(resp).await;
    assert_eq!(run.user_id.len(), 8);
    assert_eq!(run.session_id.len(), 8);
}

#[tokio::test]
async fn test_run_unknown_agent_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["x"]), dir.path());
    let resp = app
        .oneshot(form_post("/runs?agent_id=viab_team", "message=hi"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "Agent not found: viab_team");
}

#[tokio::test]
async fn test_run_missing_agent_id_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["x"]), dir.path());
    let resp = app.oneshot(form_post("/runs", "message=hi")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_run_empty_message_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["x"]), dir.path());
    let resp = app
        .oneshot(form_post("/runs?agent_id=boq_agent", "message=++"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_run_model_failure_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::failing("quota exceeded"), dir.path());
    let resp = app
        .oneshot(form_post("/runs?agent_id=boq_agent", "message=boq"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "internal_error");
    assert_eq!(body["detail"], "LLM error: quota exceeded");
}

#[tokio::test]
async fn test_run_with_file_attaches_image() {
    let dir = tempfile::tempdir().unwrap();
    let llm = ScriptedLlmClient::with_chunks(["Floor Plan Summary"]);
    let app = make_app(llm.clone(), dir.path());
    let resp = app
        .oneshot(multipart_post(
            "/runs?agent_id=visualizer_agent",
            multipart_body(
                &[("user_id", "u1"), ("session_id", "s1")],
                Some(("plan.png", "image/png", b"png-bytes".as_slice())),
            ),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, b"Floor Plan Summary");

    let request = &llm.requests()[0];
    assert_eq!(request.message, VISUALIZER_IMAGE_PROMPT);
    assert_eq!(request.images[0].data, b"png-bytes");
    assert_eq!(std::fs::read_dir(dir.path().join("u1")).unwrap().count(), 1);
}

#[tokio::test]
async fn test_run_skips_empty_file_part() {
    let dir = tempfile::tempdir().unwrap();
    let llm = ScriptedLlmClient::with_chunks(["ok"]);
    let app = make_app(llm.clone(), dir.path());
    let resp = app
        .oneshot(multipart_post(
            "/runs?agent_id=interview_agent",
            multipart_body(
                &[("message", "hi"), ("user_id", "u1")],
                Some(("", "application/octet-stream", b"".as_slice())),
            ),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, b"ok");

    assert!(llm.requests()[0].images.is_empty());
    assert!(!dir.path().join("u1").exists());
}

#[tokio::test]
async fn test_run_json_body_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let llm = ScriptedLlmClient::with_chunks(["x"]);
    let app = make_app(llm.clone(), dir.path());
    let req = Request::post("/runs?agent_id=interview_agent")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"message":"hi"}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Unsupported content type 'application/json'"));
    assert!(llm.requests().is_empty());
}

#[tokio::test]
async fn test_run_invalid_session_header_rejected_before_model_call() {
    let dir = tempfile::tempdir().unwrap();
    let llm = ScriptedLlmClient::with_chunks(["x"]);
    let app = make_app(llm.clone(), dir.path());
    let resp = app
        .oneshot(form_post(
            "/runs?agent_id=interview_agent",
            "message=hi&user_id=u1&session_id=a%0Ab",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "'x-session-id' contains invalid characters");
    assert!(llm.requests().is_empty());
}

#[tokio::test]
async fn test_run_json_mode_accepts_any_session_text() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["ok"]), dir.path());
    let resp = app
        .oneshot(form_post(
            "/runs?agent_id=interview_agent",
            "message=hi&stream=false&session_id=a%0Ab",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let run: RunResponse = body_json(resp).await;
    assert_eq!(run.session_id, "a\nb");
}

#[tokio::test]
async fn test_runs_are_listed_by_session() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["reply"]), dir.path());

    for message in ["first", "second"] {
        let resp = app
            .clone()
            .oneshot(form_post(
                "/runs?agent_id=interview_agent",
                &format!("message={message}&stream=false&user_id=u1&session_id=s1"),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app.clone().oneshot(get("/sessions/s1/runs")).await.unwrap();
    let runs: SessionRunsResponse = body_json(resp).await;
    let messages: Vec<&str> = runs.runs.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second"]);

    let resp = app.oneshot(get("/sessions?user_id=u1")).await.unwrap();
    let sessions: SessionsResponse = body_json(resp).await;
    assert_eq!(sessions.sessions.len(), 1);
    assert_eq!(sessions.sessions[0].run_count, 2);
    assert_eq!(sessions.sessions[0].agent_ids, vec!["interview_agent"]);
}

#[tokio::test]
async fn test_memory_directives_are_exposed() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(
        ScriptedLlmClient::with_chunks(["Noted. memory.save('floors', '2')"]),
        dir.path(),
    );
    let resp = app
        .clone()
        .oneshot(form_post(
            "/runs?agent_id=interview_agent",
            "message=two+floors&stream=false&user_id=u1&session_id=s1",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(get("/memories?user_id=u1")).await.unwrap();
    let memories: MemoriesResponse = body_json(resp).await;
    assert_eq!(memories.memories.len(), 1);
    assert_eq!(memories.memories[0].key, "floors");
    assert_eq!(memories.memories[0].value, "2");
}

// =============================================================================
// POST /analyze-image
// =============================================================================

#[tokio::test]
async fn test_analyze_image_happy_path() {
    let dir = tempfile::tempdir().unwrap();
    let data: &[u8] = b"\x89PNG\r\n\x1a\nfake-image";
    let app = make_app(
        ScriptedLlmClient::with_chunks(["Floor Plan ", "Summary"]),
        dir.path(),
    );
    let resp = app
        .oneshot(multipart_post(
            "/analyze-image",
            multipart_body(&[("user_id", "u1")], Some(("plan.png", "image/png", data))),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: AnalyzeImageResponse = body_json(resp).await;
    assert_eq!(body.status, "success");
    assert_eq!(body.message, "Analyze the uploaded image");
    assert_eq!(body.analysis, "Floor Plan Summary");
    assert_eq!(body.user_id, "u1");
    assert_eq!(body.file_info.original_name, "plan.png");
    assert_eq!(body.file_info.size_bytes, data.len() as u64);
    assert_eq!(body.file_info.content_type.as_deref(), Some("image/png"));

    let saved = Path::new(&body.file_info.saved_path);
    assert_eq!(saved.parent().unwrap(), dir.path().join("u1"));
    let name = saved.file_name().unwrap().to_str().unwrap();
    assert_eq!(name.len(), "YYYYmmdd_HHMMSS_plan.png".len());
    assert!(name.ends_with("_plan.png"));
    assert!(name[..8].chars().all(|c| c.is_ascii_digit()));
    assert_eq!(std::fs::read(saved).unwrap(), data);
}

#[tokio::test]
async fn test_analyze_image_defaults_user() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["ok"]), dir.path());
    let resp = app
        .oneshot(multipart_post(
            "/analyze-image",
            multipart_body(&[], Some(("plan.jpg", "image/jpeg", b"jpg".as_slice()))),
        ))
        .await
        .unwrap();
    let body: AnalyzeImageResponse = body_json(resp).await;
    assert_eq!(body.user_id, "default_user");
    assert!(dir.path().join("default_user").is_dir());
}

#[tokio::test]
async fn test_analyze_image_agent_failure_is_reported_in_payload() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::failing("model offline"), dir.path());
    let resp = app
        .oneshot(multipart_post(
            "/analyze-image",
            multipart_body(&[("user_id", "u1")], Some(("plan.png", "image/png", b"x".as_slice()))),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: AnalyzeImageResponse = body_json(resp).await;
    assert_eq!(body.analysis, "Analysis failed: LLM error: model offline");
}

#[tokio::test]
async fn test_analyze_image_missing_file_is_422() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["x"]), dir.path());
    let resp = app
        .oneshot(multipart_post(
            "/analyze-image",
            multipart_body(&[("message", "look")], None),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = body_json(resp).await;
    assert!(body["detail"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn test_analyze_image_empty_file_part_is_422() {
    let dir = tempfile::tempdir().unwrap();
    let llm = ScriptedLlmClient::with_chunks(["x"]);
    let app = make_app(llm.clone(), dir.path());
    let resp = app
        .oneshot(multipart_post(
            "/analyze-image",
            multipart_body(
                &[("user_id", "u1")],
                Some(("", "application/octet-stream", b"".as_slice())),
            ),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(llm.requests().is_empty());
    assert!(!dir.path().join("u1").exists());
}

#[tokio::test]
async fn test_analyze_image_blank_session_is_generated() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app(ScriptedLlmClient::with_chunks(["ok"]), dir.path());
    let resp = app
        .oneshot(multipart_post(
            "/analyze-image",
            multipart_body(
                &[("user_id", "u1"), ("session_id", "")],
                Some(("plan.png", "image/png", b"x".as_slice())),
            ),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: AnalyzeImageResponse = body_json(resp).await;
    assert_eq!(body.session_id.len(), 8);
    assert!(body.session_id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn test_analyze_image_filesystem_error_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();

    let app = make_app(ScriptedLlmClient::with_chunks(["x"]), &blocker);
    let resp = app
        .oneshot(multipart_post(
            "/analyze-image",
            multipart_body(&[("user_id", "u1")], Some(("plan.png", "image/png", b"x".as_slice()))),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "internal_error");
    assert!(body["detail"].as_str().unwrap().contains("upload"));
}
