//! VIAB application binary - composition root.
//!
//! 1. Load `.env`, configuration and CLI overrides
//! 2. Open the SQLite session store
//! 3. Build the model client and the three agents
//! 4. Serve the HTTP API, or run a terminal chat with one agent

mod cli;

use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use viab_agents::{build_llm_client, stream_text_response, AgentRegistry, RunInput};
use viab_api::{start_server, AppState};
use viab_core::config::ViabConfig;
use viab_core::ids::generate_session_id;
use viab_storage::{Database, TableNames};

use cli::{CliArgs, Command};

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

/// Interactive loop on stdin. `/image <path> [message]` attaches a file.
async fn chat_loop(
    registry: &AgentRegistry,
    agent_id: &str,
    session: Option<String>,
    user_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let agent = registry.get(agent_id)?;
    let session_id = session.unwrap_or_else(generate_session_id);

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(
            format!(
                "Chatting with {} (session {}). Type 'exit' to quit.\n",
                agent.spec().name,
                session_id
            )
            .as_bytes(),
        )
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        let input = match line.strip_prefix("/image ") {
            Some(rest) => {
                let (path, message) = rest.trim().split_once(' ').unwrap_or((rest.trim(), ""));
                RunInput::new(message, user_id, &session_id).with_image(PathBuf::from(path))
            }
            None => RunInput::new(line, user_id, &session_id),
        };

        let mut chunks = pin!(stream_text_response(agent.run(input)));
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(text) => {
                    stdout.write_all(text.as_bytes()).await?;
                    stdout.flush().await?;
                }
                Err(e) => {
                    tracing::warn!(agent_id, error = %e, "Chat run failed");
                    stdout.write_all(format!("\n[error] {}", e).as_bytes()).await?;
                    break;
                }
            }
        }
        stdout.write_all(b"\n").await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env: {}", e);
        }
    }

    let args = CliArgs::parse();

    // Config is read before tracing starts so its log level can seed the filter.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = ViabConfig::load_or_default(&config_file);
    config.apply_env_overrides(|key| std::env::var(key).ok());
    args.apply_overrides(&mut config);

    init_tracing(&config.general.log_level);
    tracing::info!("Starting VIAB v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
        None => tracing::info!(path = %config_file.display(), "Configuration resolved"),
    }
    config.validate()?;

    // Storage.
    let db_path = config.db_path();
    let db = Database::new(&db_path, TableNames::from(&config.storage))?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // Model client.
    let llm = build_llm_client(&config.model)?;
    tracing::info!(
        backend = llm.name(),
        model = %config.model.default_model,
        "Model client ready"
    );

    match args.command() {
        Command::Serve => {
            let state = AppState::new(config.clone(), llm, db);
            tracing::info!(
                "Chat UI at http://{}:{}/ui",
                config.server.host,
                config.server.port
            );
            start_server(&config, state).await?;
        }
        Command::Chat {
            agent,
            session,
            user,
        } => {
            let registry = AgentRegistry::builtin(&config, llm, Arc::new(db));
            chat_loop(&registry, &agent, session, &user).await?;
        }
    }

    Ok(())
}
