//! Agent definition and the run pipeline.
//!
//! An agent is configuration: instruction text, a model name and history /
//! memory switches. `Agent::run` assembles the prompt, streams the model's
//! deltas as [`RunEvent`]s and persists the finished run.

use std::path::PathBuf;
use std::pin::Pin;

use async_stream::try_stream;
use chrono::Utc;
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use viab_core::config::ViabConfig;
use viab_core::ids::generate_run_id;
use viab_core::types::{ChatTurn, RunEvent, RunEventKind, StoredRun, UserMemory};
use viab_storage::{MemoryRepository, RunRepository};

use crate::error::AgentError;
use crate::llm::{LlmRequest, SharedLlmClient, TextStream};
use crate::media::load_image;
use crate::memory::parse_memory_directives;

/// Stream of events for a single run.
pub type RunStream = Pin<Box<dyn Stream<Item = Result<RunEvent, AgentError>> + Send>>;

/// Static description of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentSpec {
    pub agent_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub instructions: &'static [&'static str],
    pub expected_output: &'static str,
    /// Message substituted when images arrive without text.
    pub image_prompt: Option<&'static str>,
}

/// Per-deployment settings applied to every agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub add_history_to_messages: bool,
    pub num_history_runs: usize,
    pub enable_user_memories: bool,
}

impl AgentSettings {
    pub fn from_config(config: &ViabConfig, agent_id: &str) -> Self {
        Self {
            model: config.model_for(agent_id),
            temperature: config.model.temperature,
            add_history_to_messages: config.agents.add_history_to_messages,
            num_history_runs: config.agents.num_history_runs,
            enable_user_memories: config.agents.enable_user_memories,
        }
    }
}

/// Input for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunInput {
    pub message: String,
    pub user_id: String,
    pub session_id: String,
    pub images: Vec<PathBuf>,
}

impl RunInput {
    pub fn new(
        message: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.images.push(path.into());
        self
    }
}

/// A runnable agent: spec plus settings, model client and storage.
#[derive(Clone)]
pub struct Agent {
    spec: AgentSpec,
    settings: AgentSettings,
    llm: SharedLlmClient,
    runs: RunRepository,
    memories: MemoryRepository,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("agent_id", &self.spec.agent_id)
            .field("settings", &self.settings)
            .field("llm", &self.llm.name())
            .finish()
    }
}

impl Agent {
    pub fn new(
        spec: AgentSpec,
        settings: AgentSettings,
        llm: SharedLlmClient,
        runs: RunRepository,
        memories: MemoryRepository,
    ) -> Self {
        Self {
            spec,
            settings,
            llm,
            runs,
            memories,
        }
    }

    pub fn id(&self) -> &'static str {
        self.spec.agent_id
    }

    pub fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Build the system instruction, including remembered facts.
    pub fn system_instruction(&self, memories: &[UserMemory]) -> String {
        let mut out = String::new();
        out.push_str(self.spec.description);
        out.push_str("\n\n<instructions>\n");
        for line in self.spec.instructions {
            out.push_str("- ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("</instructions>\n");

        if !self.spec.expected_output.is_empty() {
            out.push_str("\n<expected_output>\n");
            out.push_str(self.spec.expected_output);
            out.push_str("\n</expected_output>\n");
        }

        if !memories.is_empty() {
            out.push_str("\n<memories_from_previous_interactions>\n");
            for memory in memories {
                out.push_str(&format!("- {}: {}\n", memory.key, memory.value));
            }
            out.push_str("</memories_from_previous_interactions>\n");
        }
        out
    }

    /// Resolve the effective user message for this input.
    fn effective_message(&self, input: &RunInput) -> Result<String, AgentError> {
        if !input.message.trim().is_empty() {
            return Ok(input.message.clone());
        }
        match self.spec.image_prompt {
            Some(prompt) if !input.images.is_empty() => Ok(prompt.to_string()),
            _ => Err(AgentError::EmptyMessage),
        }
    }

    async fn build_request(&self, input: &RunInput) -> Result<LlmRequest, AgentError> {
        let message = self.effective_message(input)?;

        let memories = if self.settings.enable_user_memories {
            self.memories.list(&input.user_id)?
        } else {
            Vec::new()
        };

        let history = if self.settings.add_history_to_messages {
            self.runs
                .recent_for_session(&input.session_id, self.settings.num_history_runs)?
                .into_iter()
                .flat_map(|run| [ChatTurn::user(run.message), ChatTurn::model(run.response)])
                .collect()
        } else {
            Vec::new()
        };

        let mut images = Vec::with_capacity(input.images.len());
        for path in &input.images {
            images.push(load_image(path).await?);
        }

        Ok(LlmRequest {
            model: self.settings.model.clone(),
            system_instruction: self.system_instruction(&memories),
            history,
            message,
            images,
            temperature: self.settings.temperature,
        })
    }

    fn persist(
        &self,
        input: &RunInput,
        run_id: &str,
        message: String,
        response: String,
    ) -> Result<(), AgentError> {
        if self.settings.enable_user_memories {
            for (key, value) in parse_memory_directives(&response) {
                debug!(user_id = %input.user_id, key = %key, "Saving user memory");
                self.memories.upsert(&input.user_id, &key, &value)?;
            }
        }

        self.runs.save(&StoredRun {
            run_id: run_id.to_string(),
            agent_id: self.spec.agent_id.to_string(),
            user_id: input.user_id.clone(),
            session_id: input.session_id.clone(),
            message,
            response,
            created_at: Utc::now(),
        })?;
        Ok(())
    }

    /// Send the prompt to the model. Resolves once the model has accepted
    /// the request, so failures up to that point surface here and not in
    /// the stream.
    pub async fn start(&self, input: RunInput) -> Result<StartedRun, AgentError> {
        let run_id = generate_run_id();
        let agent_id = self.spec.agent_id;

        info!(
            agent_id,
            run_id = %run_id,
            user_id = %input.user_id,
            session_id = %input.session_id,
            images = input.images.len(),
            "Agent run started"
        );

        let request = self.build_request(&input).await?;
        let message = request.message.clone();
        let deltas = self.llm.stream(request).await?;

        let started = RunEvent::new(RunEventKind::RunStarted, agent_id, &run_id, &input.session_id);
        let events = Box::pin(response_events(self.clone(), input, run_id, message, deltas));
        Ok(StartedRun { started, events })
    }

    /// Start a run as a single stream: `RunStarted` once the model has
    /// accepted the request, one `RunResponseContent` per model delta, then
    /// `RunCompleted` once the run has been stored. Failures before the
    /// model accepts the request arrive as the first item.
    pub fn run(&self, input: RunInput) -> RunStream {
        Box::pin(run_events(self.clone(), input))
    }
}

/// A run the model has accepted.
pub struct StartedRun {
    pub started: RunEvent,
    /// Content events followed by `RunCompleted`.
    pub events: RunStream,
}

impl std::fmt::Debug for StartedRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartedRun")
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

fn run_events(
    agent: Agent,
    input: RunInput,
) -> impl Stream<Item = Result<RunEvent, AgentError>> + Send {
    try_stream! {
        let StartedRun { started, mut events } = agent.start(input).await?;
        yield started;
        while let Some(event) = events.next().await {
            yield event?;
        }
    }
}

fn response_events(
    agent: Agent,
    input: RunInput,
    run_id: String,
    message: String,
    mut deltas: TextStream,
) -> impl Stream<Item = Result<RunEvent, AgentError>> + Send {
    try_stream! {
        let agent_id = agent.spec.agent_id;
        let session_id = input.session_id.clone();

        let mut response = String::new();
        while let Some(delta) = deltas.next().await {
            let delta = delta.inspect_err(|e| {
                warn!(agent_id, run_id = %run_id, error = %e, "Model stream failed");
            })?;
            if delta.is_empty() {
                continue;
            }
            response.push_str(&delta);
            yield RunEvent::content(agent_id, &run_id, &session_id, delta);
        }

        let response_len = response.len();
        agent.persist(&input, &run_id, message, response)?;
        info!(agent_id, run_id = %run_id, response_len, "Agent run completed");
        yield RunEvent::new(RunEventKind::RunCompleted, agent_id, &run_id, &session_id);
    }
}
