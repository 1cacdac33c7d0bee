//! Lookup of runnable agents by identifier.

use std::collections::BTreeMap;
use std::sync::Arc;

use viab_core::config::ViabConfig;
use viab_storage::{Database, MemoryRepository, RunRepository};

use crate::agent::{Agent, AgentSettings};
use crate::error::AgentError;
use crate::llm::SharedLlmClient;
use crate::prompts::BUILTIN_AGENTS;

/// Fixed set of agents built at startup.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<&'static str, Agent>,
}

impl AgentRegistry {
    /// Register the interview, visualizer and BOQ agents sharing one client
    /// and one database.
    pub fn builtin(config: &ViabConfig, llm: SharedLlmClient, db: Arc<Database>) -> Self {
        let runs = RunRepository::new(Arc::clone(&db));
        let memories = MemoryRepository::new(db);
        let mut registry = Self::default();
        for spec in BUILTIN_AGENTS {
            registry.register(Agent::new(
                spec,
                AgentSettings::from_config(config, spec.agent_id),
                Arc::clone(&llm),
                runs.clone(),
                memories.clone(),
            ));
        }
        registry
    }

    pub fn register(&mut self, agent: Agent) {
        tracing::debug!(agent_id = agent.id(), model = %agent.settings().model, "Registered agent");
        self.agents.insert(agent.id(), agent);
    }

    pub fn get(&self, agent_id: &str) -> Result<&Agent, AgentError> {
        self.agents
            .get(agent_id)
            .ok_or_else(|| AgentError::UnknownAgent(agent_id.to_string()))
    }

    /// Agents ordered by identifier.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
