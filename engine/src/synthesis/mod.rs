//! Synthesis Engine
//!
//! Builds the single request sent to the external chat model and
//! returns the generated reply. Two shapes exist:
//!
//! - **Plain path**: contextual-assistant system prompt, message list
//!   is the full context window in order, no evidence.
//! - **Research path**: cite-with-brackets system prompt, message list
//!   is the window minus its last entry (the just-recorded user turn)
//!   followed by one synthetic user turn carrying the numbered
//!   evidence block and the original question.
//!
//! The reasoning trace is generated locally from counts the
//! orchestrator already knows. It is an audit string, not model
//! introspection, and no part of it comes from the provider.

use std::sync::Arc;
use tracing::debug;

use crate::error::EngineError;
use crate::llm::{ChatModel, Message};
use crate::search::SearchResult;

/// System instruction for the research path
const RESEARCH_SYSTEM_PROMPT: &str = "You are a financial research assistant. \
Use the conversation history to provide contextual responses. \
Always cite sources using [1], [2] format.";

/// System instruction for the plain path
const PLAIN_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. \
Remember the conversation context and provide relevant responses.";

/// Format search results as a numbered evidence block:
/// one `[i] title: snippet` line per source.
pub fn evidence_block(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] {}: {}", i + 1, r.title, r.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Locally generated audit trace for a research turn.
pub fn reasoning_trace(history_len: usize, source_count: usize, question: &str) -> String {
    format!(
        "Research steps:\n\
         1. Reviewed conversation history ({} messages)\n\
         2. Searched {} sources about: \"{}\"\n\
         3. Analyzing financial data with context\n\
         4. Synthesizing insights with citations",
        history_len, source_count, question
    )
}

/// Assemble the plain-path request: full window, no evidence.
pub fn build_plain_request(history: &[Message]) -> (&'static str, Vec<Message>) {
    (PLAIN_SYSTEM_PROMPT, history.to_vec())
}

/// Assemble the research-path request.
///
/// The window's last entry is the user turn recorded moments ago; it
/// is replaced by a synthetic user turn that folds the evidence block
/// and the original question together.
pub fn build_research_request(
    history: &[Message],
    results: &[SearchResult],
    question: &str,
) -> (&'static str, Vec<Message>) {
    let context = evidence_block(results);

    let mut messages: Vec<Message> = history
        .iter()
        .take(history.len().saturating_sub(1))
        .cloned()
        .collect();

    messages.push(Message::user(format!(
        "Based on our previous conversation and these sources:\n{}\n\nQuestion: {}",
        context, question
    )));

    (RESEARCH_SYSTEM_PROMPT, messages)
}

/// Invokes the chat model with assembled requests
pub struct SynthesisEngine {
    model: Arc<dyn ChatModel>,
}

impl SynthesisEngine {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Synthesize a reply without evidence.
    pub async fn synthesize_plain(&self, history: &[Message]) -> Result<String, EngineError> {
        let (system, messages) = build_plain_request(history);
        self.complete(system, &messages).await
    }

    /// Synthesize a cited reply from evidence.
    pub async fn synthesize_research(
        &self,
        history: &[Message],
        results: &[SearchResult],
        question: &str,
    ) -> Result<String, EngineError> {
        let (system, messages) = build_research_request(history, results, question);
        self.complete(system, &messages).await
    }

    /// Any provider error collapses into the single synthesis-failure
    /// condition; no partial content escapes.
    async fn complete(&self, system: &str, messages: &[Message]) -> Result<String, EngineError> {
        debug!(
            "Synthesizing via {} with {} messages",
            self.model.name(),
            messages.len()
        );

        self.model
            .complete(system, messages)
            .await
            .map_err(|e| EngineError::SynthesisFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_results() -> Vec<SearchResult> {
        vec![
            SearchResult {
                url: "https://example.com/a".to_string(),
                title: "Rate decision".to_string(),
                snippet: "The central bank held rates steady.".to_string(),
            },
            SearchResult {
                url: "https://example.com/b".to_string(),
                title: "Market reaction".to_string(),
                snippet: "Equities rallied on the news.".to_string(),
            },
        ]
    }

    #[test]
    fn test_evidence_block_numbering() {
        let block = evidence_block(&sample_results());
        let lines: Vec<&str> = block.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "[1] Rate decision: The central bank held rates steady.");
        assert!(lines[1].starts_with("[2] Market reaction:"));
    }

    #[test]
    fn test_evidence_block_empty() {
        assert_eq!(evidence_block(&[]), "");
    }

    #[test]
    fn test_reasoning_trace_mentions_counts() {
        let trace = reasoning_trace(4, 2, "what moved the market?");

        assert!(trace.contains("4 messages"));
        assert!(trace.contains("Searched 2 sources"));
        assert!(trace.contains("what moved the market?"));
        assert_eq!(trace.lines().count(), 5);
    }

    #[test]
    fn test_plain_request_keeps_full_window() {
        let history = vec![
            Message::user("hello"),
            Message::assistant("hi"),
            Message::user("tell me a joke"),
        ];

        let (system, messages) = build_plain_request(&history);

        assert!(system.contains("helpful AI assistant"));
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].content, "tell me a joke");
    }

    #[test]
    fn test_research_request_replaces_last_entry() {
        let history = vec![
            Message::user("hello"),
            Message::assistant("hi"),
            Message::user("what is the stock price of X?"),
        ];

        let (system, messages) =
            build_research_request(&history, &sample_results(), "what is the stock price of X?");

        assert!(system.contains("cite sources using [1], [2]"));
        // Window minus its last entry, plus one synthetic turn
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "hi");

        let synthetic = &messages[2];
        assert!(synthetic.content.contains("[1] Rate decision"));
        assert!(synthetic.content.contains("Question: what is the stock price of X?"));
    }

    #[test]
    fn test_research_request_on_fresh_thread() {
        // A fresh thread's window holds only the just-recorded user
        // turn; the research request is then the synthetic turn alone.
        let history = vec![Message::user("invest in what?")];

        let (_, messages) = build_research_request(&history, &[], "invest in what?");

        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.contains("Question: invest in what?"));
    }
}
