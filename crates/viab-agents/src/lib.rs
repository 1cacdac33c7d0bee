//! Agents, model clients and the run pipeline.

pub mod agent;
pub mod error;
pub mod llm;
pub mod media;
pub mod memory;
pub mod prompts;
pub mod registry;
pub mod stream;

pub use agent::{Agent, AgentSettings, AgentSpec, RunInput, RunStream, StartedRun};
pub use error::AgentError;
pub use llm::{build_llm_client, LlmClient, LlmRequest, SharedLlmClient};
pub use registry::AgentRegistry;
pub use stream::{collect_text, stream_text_response};
