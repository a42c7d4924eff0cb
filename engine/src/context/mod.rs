//! Context Window Builder
//!
//! Assembles the bounded recent-message history a synthesis request is
//! allowed to see. Messages are fetched newest-first (a bounded-cost
//! query regardless of thread length) and reversed back to
//! chronological order, each reduced to `{role, content}`.

use anyhow::Result;

use crate::db::{MessageRepository, MessageRole};
use crate::llm::Message;

/// Number of recent messages supplied to synthesis
pub const CONTEXT_WINDOW: usize = 10;

/// Builds bounded conversation context for a thread
pub struct ContextWindowBuilder {
    messages: MessageRepository,
    window: usize,
}

impl ContextWindowBuilder {
    /// Create a builder with the default window size
    pub fn new(messages: MessageRepository) -> Self {
        Self::with_window(messages, CONTEXT_WINDOW)
    }

    /// Create a builder with a specific window size
    pub fn with_window(messages: MessageRepository, window: usize) -> Self {
        Self { messages, window }
    }

    /// Return the most recent messages of a thread in chronological
    /// order. Empty for a thread with no history; store errors
    /// propagate.
    pub async fn build(&self, thread_id: &str) -> Result<Vec<Message>> {
        let mut recent = self.messages.recent(thread_id, self.window as i64).await?;
        recent.reverse();

        Ok(recent
            .into_iter()
            .map(|record| match record.role {
                MessageRole::User => Message::user(record.content),
                MessageRole::Assistant => Message::assistant(record.content),
            })
            .collect())
    }
}
