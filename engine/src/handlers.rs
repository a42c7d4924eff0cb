//! Command handlers
//!
//! Wires configuration into the engine (database, provider clients,
//! orchestrator) and implements the CLI subcommands on top of it.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::api::{self, ServerState};
use crate::config::Config;
use crate::db::Database;
use crate::llm::{gemini::GeminiClient, openai::OpenAiCompatClient, ChatModel};
use crate::orchestrator::{TurnOrchestrator, TurnOutcome};
use crate::search::{SearchProvider, TavilyClient};

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Construct the chat model client named by the configuration.
fn build_model(config: &Config) -> Arc<dyn ChatModel> {
    let api_key = config.llm.resolved_api_key();
    match config.llm.provider.as_str() {
        "gemini" => Arc::new(GeminiClient::new(
            config.llm.gemini.base_url.clone(),
            config.llm.gemini.model.clone(),
            api_key,
        )),
        // Config validation admits only "openai" and "gemini".
        _ => Arc::new(OpenAiCompatClient::new(
            config.llm.openai.base_url.clone(),
            config.llm.openai.model.clone(),
            api_key,
        )),
    }
}

/// Construct the search provider client.
fn build_search(config: &Config) -> Arc<dyn SearchProvider> {
    Arc::new(TavilyClient::new(
        config.search.base_url.clone(),
        config.search.resolved_api_key(),
    ))
}

/// Open the database and assemble the orchestrator plus API state.
async fn build_state(config: &Config) -> Result<(Database, ServerState)> {
    let db = Database::new(&config.db_path())
        .await
        .context("Failed to open database")?;

    let orchestrator = Arc::new(TurnOrchestrator::new(
        &db,
        build_search(config),
        build_model(config),
    ));

    let state = ServerState {
        orchestrator,
        threads: Arc::new(db.threads()),
        messages: Arc::new(db.messages()),
        evidence: Arc::new(db.evidence()),
    };

    Ok((db, state))
}

/// Run the HTTP API server until interrupted.
pub async fn handle_serve(config: &Config) -> Result<()> {
    let (db, state) = build_state(config).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    api::serve(addr, state).await?;

    db.close().await?;
    Ok(())
}

/// Submit one message, creating a thread when none was given.
pub async fn handle_chat(
    thread: Option<String>,
    message: &str,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let (db, state) = build_state(config).await?;

    let thread_id = match thread {
        Some(id) => id,
        None => {
            let thread = state.threads.create("local", None).await?;
            info!("Created thread {}", thread.id);
            thread.id
        }
    };

    let outcome = state.orchestrator.submit_turn(&thread_id, message).await?;

    match (format, outcome) {
        (OutputFormat::Json, TurnOutcome::Completed(msg)) => {
            println!(
                "{}",
                serde_json::json!({"success": true, "thread_id": thread_id, "message": msg})
            );
        }
        (OutputFormat::Json, TurnOutcome::Failed { reason }) => {
            println!(
                "{}",
                serde_json::json!({"success": false, "thread_id": thread_id, "error": reason})
            );
        }
        (OutputFormat::Text, TurnOutcome::Completed(msg)) => {
            if let Some(trace) = &msg.reasoning {
                println!("{}\n", trace);
            }
            println!("{}", msg.content);
            if !msg.evidence_ids.is_empty() {
                let evidence = state.evidence.get_many(&msg.evidence_ids).await?;
                println!("\nSources:");
                for (i, e) in evidence.iter().enumerate() {
                    println!("  [{}] {} - {}", i + 1, e.title, e.url);
                }
            }
        }
        (OutputFormat::Text, TurnOutcome::Failed { reason }) => {
            println!("Turn failed: {}", reason);
            println!("Your message was saved; resubmitting is safe.");
        }
    }

    db.close().await?;
    Ok(())
}

/// List a user's threads.
pub async fn handle_threads(user: &str, config: &Config, format: OutputFormat) -> Result<()> {
    let (db, state) = build_state(config).await?;

    let threads = state.threads.list_for_user(user).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({"success": true, "threads": threads}));
        }
        OutputFormat::Text => {
            if threads.is_empty() {
                println!("No threads for user '{}'.", user);
            } else {
                for thread in &threads {
                    println!(
                        "{}  {:<30} {} messages",
                        thread.id, thread.title, thread.message_count
                    );
                }
                println!("\n{} thread(s).", threads.len());
            }
        }
    }

    db.close().await?;
    Ok(())
}
