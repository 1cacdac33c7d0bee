use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ViabError};

/// Top-level configuration for the VIAB service.
///
/// Loaded from `~/.viab/config.toml` by default, then overlaid with
/// environment variables (see [`ViabConfig::apply_env_overrides`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViabConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
}

impl ViabConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ViabConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults when the
    /// file is missing or invalid. A load failure is handed back for the
    /// caller to report, since this runs before logging is set up.
    pub fn load_or_default(path: &Path) -> (Self, Option<ViabError>) {
        if !path.exists() {
            return (Self::default(), None);
        }
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay values taken from the environment.
    ///
    /// `lookup` is normally `|k| std::env::var(k).ok()`; tests pass a map.
    /// Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = get("GEMINI_MODEL") {
            self.model.default_model = model;
        }
        if let Some(model) = get("GOOGLE_MODEL") {
            self.agents.interview_model = Some(model);
        }
        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            self.model.api_key = Some(key);
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            self.model.base_url = url;
        }
        if let Some(path) = get("VIAB_DB_PATH") {
            self.storage.db_path = Some(path);
        }
        if let Some(dir) = get("VIAB_UPLOAD_DIR") {
            self.uploads.dir = dir;
        }
        if let Some(port) = get("VIAB_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!(value = %port, "Ignoring invalid VIAB_PORT"),
            }
        }
    }

    /// Reject values that would break storage or the server at runtime.
    pub fn validate(&self) -> Result<()> {
        for (field, name) in [
            ("storage.runs_table", &self.storage.runs_table),
            ("storage.memory_table", &self.storage.memory_table),
        ] {
            if !is_sql_identifier(name) {
                return Err(ViabError::Config(format!(
                    "{} must be an identifier of letters, digits and '_', got '{}'",
                    field, name
                )));
            }
        }
        if self.storage.runs_table == self.storage.memory_table {
            return Err(ViabError::Config(
                "storage.runs_table and storage.memory_table must differ".to_string(),
            ));
        }
        if self.server.max_body_mb == 0 {
            return Err(ViabError::Config(
                "server.max_body_mb must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Data directory with a leading `~` expanded.
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.general.data_dir)
    }

    /// Database path: `storage.db_path` if set, else `<data_dir>/viab.db`.
    pub fn db_path(&self) -> PathBuf {
        match self.storage.db_path {
            Some(ref p) => expand_home(p),
            None => self.data_dir().join("viab.db"),
        }
    }

    /// Model identifier for the given agent, falling back to the default.
    pub fn model_for(&self, agent_id: &str) -> String {
        let specific = match agent_id {
            "interview_agent" => self.agents.interview_model.as_ref(),
            "visualizer_agent" => self.agents.visualizer_model.as_ref(),
            "boq_agent" => self.agents.boq_model.as_ref(),
            _ => None,
        };
        specific
            .cloned()
            .unwrap_or_else(|| self.model.default_model.clone())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.viab/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit in megabytes (uploads included).
    pub max_body_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_body_mb: 25,
        }
    }
}

/// LLM backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model used by every agent without a specific override.
    pub default_model: String,
    /// Gemini REST base URL, up to and including `/models`.
    pub base_url: String,
    /// API key. Usually supplied through the environment instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    /// Use the echo client when no API key is available.
    pub fallback_to_echo: bool,
    /// Longest wait for response headers, then for each streamed chunk.
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            api_key: None,
            temperature: None,
            fallback_to_echo: true,
            request_timeout_secs: 120,
        }
    }
}

/// Agent wiring shared by the interview, visualizer and BOQ agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub interview_model: Option<String>,
    pub visualizer_model: Option<String>,
    pub boq_model: Option<String>,
    /// Replay earlier runs of the session to the model.
    pub add_history_to_messages: bool,
    /// Number of earlier runs to replay.
    pub num_history_runs: usize,
    /// Load and update per-user memories.
    pub enable_user_memories: bool,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            interview_model: None,
            visualizer_model: None,
            boq_model: None,
            add_history_to_messages: true,
            num_history_runs: 5,
            enable_user_memories: true,
        }
    }
}

/// Session storage and memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Explicit database file. Defaults to `<data_dir>/viab.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
    /// Table holding completed runs.
    pub runs_table: String,
    /// Table holding user memories.
    pub memory_table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            runs_table: "shared_storage".to_string(),
            memory_table: "shared_memories".to_string(),
        }
    }
}

/// Uploaded file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Root directory; files land in `<dir>/<user_id>/`.
    pub dir: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
        }
    }
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").ok();
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").ok();
        if let Some(home) = home {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
