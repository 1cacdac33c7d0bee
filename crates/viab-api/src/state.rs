//! Application state shared across all route handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use viab_agents::{AgentRegistry, SharedLlmClient};
use viab_core::config::{expand_home, ViabConfig};
use viab_storage::{Database, MemoryRepository, RunRepository};

/// Shared application state.
///
/// All fields are cheap to clone; handlers receive it through `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ViabConfig>,
    pub agents: Arc<AgentRegistry>,
    pub runs: RunRepository,
    pub memories: MemoryRepository,
    /// Root directory for saved uploads.
    pub upload_dir: PathBuf,
    /// Backend name reported by `/health`.
    pub llm_name: String,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Build the state and register the built-in agents.
    pub fn new(config: ViabConfig, llm: SharedLlmClient, database: Database) -> Self {
        let database = Arc::new(database);
        let llm_name = llm.name().to_string();
        let agents = AgentRegistry::builtin(&config, llm, Arc::clone(&database));
        Self {
            upload_dir: expand_home(&config.uploads.dir),
            config: Arc::new(config),
            agents: Arc::new(agents),
            runs: RunRepository::new(Arc::clone(&database)),
            memories: MemoryRepository::new(database),
            llm_name,
            start_time: Instant::now(),
        }
    }
}
