//! Turn Orchestrator
//!
//! Sequences one incoming user message through the turn state machine:
//!
//! `RECEIVED → CLASSIFIED → (RESEARCHED |) → SYNTHESIZED → PERSISTED`
//!
//! The user message is persisted unconditionally at RECEIVED, so a
//! turn that fails later still leaves it visible in history; the
//! asymmetry is intentional. Any failure in the remaining steps lands in
//! FAILED: the caller receives a structured failure outcome, the
//! thread counters stay untouched, and no assistant message is
//! written. There is no cancellation and no per-thread serialization;
//! external-call timeouts belong to the transport clients.

use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::classifier;
use crate::context::ContextWindowBuilder;
use crate::db::{Database, EvidenceStore, MessageRecord, MessageRepository, ThreadRepository};
use crate::llm::ChatModel;
use crate::search::{Retriever, SearchProvider};
use crate::synthesis::{reasoning_trace, SynthesisEngine};

/// States of a turn, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Received,
    Classified,
    Researched,
    Synthesized,
    Persisted,
    Failed,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnState::Received => "received",
            TurnState::Classified => "classified",
            TurnState::Researched => "researched",
            TurnState::Synthesized => "synthesized",
            TurnState::Persisted => "persisted",
            TurnState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Terminal result of a turn, the only type crossing the turn boundary
///
/// No error taxonomy leaks upward: a turn either completed with the
/// persisted assistant message, or failed with a reason string. A
/// failed turn is retryable by resubmission.
#[derive(Debug)]
pub enum TurnOutcome {
    Completed(MessageRecord),
    Failed { reason: String },
}

impl TurnOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TurnOutcome::Completed(_))
    }
}

/// Orchestrates the turn pipeline over injected collaborators
pub struct TurnOrchestrator {
    threads: ThreadRepository,
    messages: MessageRepository,
    evidence: EvidenceStore,
    context: ContextWindowBuilder,
    retriever: Retriever,
    synthesis: SynthesisEngine,
}

impl TurnOrchestrator {
    /// Wire an orchestrator from the database and the two external
    /// provider handles. Providers come in as trait objects so tests
    /// can substitute fakes.
    pub fn new(
        db: &Database,
        search: Arc<dyn SearchProvider>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            threads: db.threads(),
            messages: db.messages(),
            evidence: db.evidence(),
            context: ContextWindowBuilder::new(db.messages()),
            retriever: Retriever::new(search),
            synthesis: SynthesisEngine::new(model),
        }
    }

    /// Process one user message into one assistant message.
    ///
    /// Returns `Err` only when the turn never started (unknown thread,
    /// or the initial user-message write failed). Once the user
    /// message is durable, every later failure becomes
    /// `TurnOutcome::Failed` instead.
    pub async fn submit_turn(&self, thread_id: &str, user_text: &str) -> Result<TurnOutcome> {
        self.threads
            .get(thread_id)
            .await?
            .with_context(|| format!("Thread not found: {}", thread_id))?;

        // RECEIVED: the user message is persisted before anything can
        // go wrong, and stays even if everything after does.
        let user_message = self
            .messages
            .create_user_message(thread_id, user_text)
            .await?;
        debug!(state = %TurnState::Received, message_id = %user_message.id, "User message persisted");

        match self.run_pipeline(thread_id, user_text).await {
            Ok(assistant) => {
                info!(
                    thread_id,
                    message_id = %assistant.id,
                    evidence = assistant.evidence_ids.len(),
                    "Turn completed"
                );
                Ok(TurnOutcome::Completed(assistant))
            }
            Err(e) => {
                error!(thread_id, state = %TurnState::Failed, "Turn failed: {:#}", e);
                Ok(TurnOutcome::Failed {
                    reason: format!("{:#}", e),
                })
            }
        }
    }

    /// Steps CLASSIFIED through PERSISTED.
    async fn run_pipeline(&self, thread_id: &str, user_text: &str) -> Result<MessageRecord> {
        // CLASSIFIED: total function, never fails.
        let research = classifier::needs_research(user_text);
        debug!(state = %TurnState::Classified, research, "Message classified");

        // The window is computed before the research branch drops its
        // last entry, so it includes the just-recorded user turn.
        let window = self.context.build(thread_id).await?;

        let (content, reasoning, evidence_ids) = if research {
            // RESEARCHED: retrieval is fail-open, an empty evidence
            // set is not an error transition.
            let results = self.retriever.retrieve(user_text).await;
            let outcomes = self.evidence.record(thread_id, &results).await?;

            // Duplicates across threads mean fewer rows than results;
            // the citation list tolerates the mismatch.
            let inserted: Vec<String> = outcomes
                .iter()
                .filter_map(|o| o.as_inserted())
                .map(|r| r.id.clone())
                .collect();
            debug!(
                state = %TurnState::Researched,
                searched = results.len(),
                recorded = inserted.len(),
                "Evidence recorded"
            );

            let trace = reasoning_trace(window.len(), results.len(), user_text);
            let content = self
                .synthesis
                .synthesize_research(&window, &results, user_text)
                .await?;

            (content, Some(trace), inserted)
        } else {
            let content = self.synthesis.synthesize_plain(&window).await?;
            (content, None, Vec::new())
        };
        debug!(state = %TurnState::Synthesized, "Reply synthesized");

        // PERSISTED: assistant message, citations, and thread counters
        // commit as one unit.
        let assistant = self
            .threads
            .commit_assistant_turn(thread_id, &content, reasoning.as_deref(), &evidence_ids)
            .await?;
        debug!(state = %TurnState::Persisted, message_id = %assistant.id, "Turn persisted");

        Ok(assistant)
    }
}
