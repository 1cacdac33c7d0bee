//! CLI argument definitions for the VIAB binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use viab_core::config::ViabConfig;

/// VIAB - interview, floor plan analysis and bill of quantities agents.
#[derive(Parser, Debug)]
#[command(name = "viab", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Data directory for the SQLite database.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP API server (default).
    Serve,
    /// Chat with one agent in the terminal.
    Chat {
        /// Agent to talk to.
        #[arg(short = 'a', long = "agent", default_value = "interview_agent")]
        agent: String,
        /// Session to continue; a new one is generated when omitted.
        #[arg(short = 's', long = "session")]
        session: Option<String>,
        /// User the runs are stored under.
        #[arg(short = 'u', long = "user", default_value = "cli_user")]
        user: String,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > VIAB_CONFIG env var > ~/.viab/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("VIAB_CONFIG") {
            if !p.trim().is_empty() {
                return PathBuf::from(p);
            }
        }
        default_config_path()
    }

    /// Apply CLI flags on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut ViabConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    let home = if cfg!(target_os = "windows") {
        std::env::var("USERPROFILE")
    } else {
        std::env::var("HOME")
    };
    match home {
        Ok(home) => PathBuf::from(home).join(".viab").join("config.toml"),
        Err(_) => PathBuf::from("config.toml"),
    }
}
