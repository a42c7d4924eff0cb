//! HTTP API surface
//!
//! Thin axum layer over the engine. Every response is a JSON envelope
//! with a `success` flag, mirroring what the orchestrator exposes: the
//! turn endpoint returns either the persisted assistant message or a
//! failure reason, never an exception taxonomy.
//!
//! # Endpoints
//!
//! - GET  /                          - Service status
//! - POST /api/threads               - Create a thread
//! - GET  /api/threads               - List a user's threads
//! - GET  /api/threads/:id/messages  - Thread history with evidence
//! - DELETE /api/threads/:id         - Delete a thread
//! - POST /api/chat                  - Submit one turn

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::db::{EvidenceStore, MessageRepository, ThreadRepository};
use crate::error::EngineError;
use crate::orchestrator::{TurnOrchestrator, TurnOutcome};

/// Shared state for the API handlers
#[derive(Clone)]
pub struct ServerState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub threads: Arc<ThreadRepository>,
    pub messages: Arc<MessageRepository>,
    pub evidence: Arc<EvidenceStore>,
}

/// Build the API router.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .route("/api/threads", post(create_thread_handler))
        .route("/api/threads", get(list_threads_handler))
        .route("/api/threads/:id/messages", get(messages_handler))
        .route("/api/threads/:id", delete(delete_thread_handler))
        .route("/api/chat", post(chat_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve the API until ctrl-c.
pub async fn serve(addr: SocketAddr, state: ServerState) -> Result<(), EngineError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| EngineError::Network(format!("Failed to bind {}: {}", addr, e)))?;

    info!("API server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("API server shutting down gracefully");
        })
        .await
        .map_err(|e| EngineError::Network(format!("Server error: {}", e)))?;

    Ok(())
}

fn internal_error(e: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"success": false, "error": e.to_string()})),
    )
        .into_response()
}

/// Service status
async fn status_handler() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Finance Research Chat API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

#[derive(Debug, Deserialize)]
struct CreateThreadRequest {
    #[serde(default = "default_user")]
    user_id: String,
    title: Option<String>,
}

fn default_user() -> String {
    "local".to_string()
}

/// Create a thread
async fn create_thread_handler(
    State(state): State<ServerState>,
    Json(payload): Json<CreateThreadRequest>,
) -> Result<Json<serde_json::Value>, Response> {
    let thread = state
        .threads
        .create(&payload.user_id, payload.title.as_deref())
        .await
        .map_err(internal_error)?;

    Ok(Json(json!({"success": true, "thread": thread})))
}

#[derive(Debug, Deserialize)]
struct ListThreadsQuery {
    #[serde(default = "default_user")]
    user_id: String,
}

/// List a user's threads, most recently active first
async fn list_threads_handler(
    State(state): State<ServerState>,
    Query(query): Query<ListThreadsQuery>,
) -> Result<Json<serde_json::Value>, Response> {
    let threads = state
        .threads
        .list_for_user(&query.user_id)
        .await
        .map_err(internal_error)?;

    Ok(Json(json!({"success": true, "threads": threads})))
}

/// Thread history in chronological order, evidence attached
async fn messages_handler(
    State(state): State<ServerState>,
    Path(thread_id): Path<String>,
) -> Result<Json<serde_json::Value>, Response> {
    let messages = state
        .messages
        .list(&thread_id)
        .await
        .map_err(internal_error)?;

    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        let evidence = state
            .evidence
            .get_many(&message.evidence_ids)
            .await
            .map_err(internal_error)?;

        let mut value = serde_json::to_value(&message).map_err(internal_error)?;
        value["evidence"] = serde_json::to_value(evidence).map_err(internal_error)?;
        out.push(value);
    }

    Ok(Json(json!({"success": true, "messages": out})))
}

/// Delete a thread (messages cascade, evidence rows survive)
async fn delete_thread_handler(
    State(state): State<ServerState>,
    Path(thread_id): Path<String>,
) -> Result<Json<serde_json::Value>, Response> {
    let deleted = state
        .threads
        .delete(&thread_id)
        .await
        .map_err(internal_error)?;

    if !deleted {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "Thread not found"})),
        )
            .into_response());
    }

    Ok(Json(json!({"success": true, "message": "Thread deleted"})))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    thread_id: String,
    content: String,
}

/// Submit one turn
async fn chat_handler(
    State(state): State<ServerState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, Response> {
    let outcome = state
        .orchestrator
        .submit_turn(&payload.thread_id, &payload.content)
        .await
        .map_err(|e| {
            // The turn never started (unknown thread or the user
            // message itself failed to persist).
            (
                StatusCode::NOT_FOUND,
                Json(json!({"success": false, "error": format!("{:#}", e)})),
            )
                .into_response()
        })?;

    match outcome {
        TurnOutcome::Completed(message) => {
            let evidence = state
                .evidence
                .get_many(&message.evidence_ids)
                .await
                .map_err(internal_error)?;

            let mut value = serde_json::to_value(&message).map_err(internal_error)?;
            value["evidence"] = serde_json::to_value(evidence).map_err(internal_error)?;

            Ok(Json(json!({"success": true, "message": value})))
        }
        TurnOutcome::Failed { reason } => {
            Ok(Json(json!({"success": false, "error": reason})))
        }
    }
}
