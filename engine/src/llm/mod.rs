//! Chat Model Provider Abstraction Layer
//!
//! This module provides a common interface for the external language
//! model the synthesis engine talks to. The `ChatModel` trait defines
//! the contract (one system prompt plus a message sequence in, one
//! generated text out) so the orchestrator can be wired to the
//! OpenAI-compatible client, the native Gemini client, or a fake in
//! tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod gemini;
pub mod openai;

/// Result type for chat model operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during chat model operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat model trait that all providers must implement
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the name of the provider (e.g., "openai", "gemini")
    fn name(&self) -> &str;

    /// Generate a completion for the given system prompt and history
    ///
    /// # Arguments
    /// * `system` - System instruction for the model
    /// * `messages` - Conversation history in chronological order
    ///
    /// # Returns
    /// * `Ok(String)` - The generated text
    /// * `Err(LLMError)` - If the request fails
    async fn complete(&self, system: &str, messages: &[Message]) -> Result<String>;
}

/// Triage a non-success HTTP status into an `LLMError`.
pub(crate) async fn error_from_status(response: reqwest::Response) -> LLMError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    match status.as_u16() {
        401 | 403 => LLMError::AuthenticationFailed(text),
        429 => LLMError::RateLimitExceeded,
        400 | 404 => LLMError::InvalidRequest(text),
        _ => LLMError::ProviderUnavailable(format!("{}: {}", status, text)),
    }
}
