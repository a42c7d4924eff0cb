/// Thread persistence operations
///
/// A thread is the aggregate root of a conversation: it owns its
/// messages (deletion cascades) and carries the running counters the
/// orchestrator updates when a turn completes. `message_count` moves by
/// exactly 2 per completed turn and `last_message_at` never decreases.
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::messages::{MessageRecord, MessageRole};
use super::now_millis;

/// Thread record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message_count: i64,
    pub last_message_at: i64,
    pub created_at: i64,
}

/// Thread repository for database operations
pub struct ThreadRepository {
    pool: SqlitePool,
}

impl ThreadRepository {
    /// Create a new thread repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new thread
    pub async fn create(&self, user_id: &str, title: Option<&str>) -> Result<Thread> {
        let id = Uuid::new_v4().to_string();
        let title = title.unwrap_or("New Chat");
        let now = now_millis();

        sqlx::query(
            "INSERT INTO threads (id, user_id, title, message_count, last_message_at, created_at)
             VALUES (?, ?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create thread")?;

        Ok(Thread {
            id,
            user_id: user_id.to_string(),
            title: title.to_string(),
            message_count: 0,
            last_message_at: now,
            created_at: now,
        })
    }

    /// Get a thread by ID
    pub async fn get(&self, thread_id: &str) -> Result<Option<Thread>> {
        let row = sqlx::query(
            "SELECT id, user_id, title, message_count, last_message_at, created_at
             FROM threads WHERE id = ?",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch thread")?;

        Ok(row.map(|r| Thread {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            message_count: r.get("message_count"),
            last_message_at: r.get("last_message_at"),
            created_at: r.get("created_at"),
        }))
    }

    /// List a user's threads, most recently active first
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Thread>> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, message_count, last_message_at, created_at
             FROM threads WHERE user_id = ? ORDER BY last_message_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list threads")?;

        Ok(rows
            .into_iter()
            .map(|r| Thread {
                id: r.get("id"),
                user_id: r.get("user_id"),
                title: r.get("title"),
                message_count: r.get("message_count"),
                last_message_at: r.get("last_message_at"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    /// Delete a thread
    ///
    /// Messages (and their evidence links) cascade through foreign
    /// keys. Evidence rows deliberately survive: the dedup store is
    /// thread-agnostic after creation.
    pub async fn delete(&self, thread_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM threads WHERE id = ?")
            .bind(thread_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete thread")?;

        Ok(result.rows_affected() > 0)
    }

    /// Commit a completed turn: write the assistant message with its
    /// evidence references and update the thread counters, atomically.
    ///
    /// This is one SQLite transaction so a crash cannot leave an
    /// assistant message whose turn never counted (or the reverse).
    /// The user message of the turn was written earlier and on purpose
    /// sits outside this envelope.
    pub async fn commit_assistant_turn(
        &self,
        thread_id: &str,
        content: &str,
        reasoning: Option<&str>,
        evidence_ids: &[String],
    ) -> Result<MessageRecord> {
        let message_id = Uuid::new_v4().to_string();
        let now = now_millis();

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            "INSERT INTO messages (id, thread_id, role, content, reasoning, created_at)
             VALUES (?, ?, 'assistant', ?, ?, ?)",
        )
        .bind(&message_id)
        .bind(thread_id)
        .bind(content)
        .bind(reasoning)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to insert assistant message")?;

        for (position, evidence_id) in evidence_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO message_evidence (message_id, evidence_id, position) VALUES (?, ?, ?)",
            )
            .bind(&message_id)
            .bind(evidence_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .context("Failed to link evidence to message")?;
        }

        // max() keeps last_message_at monotonically non-decreasing even
        // when concurrent turns interleave.
        let updated = sqlx::query(
            "UPDATE threads
             SET message_count = message_count + 2,
                 last_message_at = max(last_message_at, ?)
             WHERE id = ?",
        )
        .bind(now)
        .bind(thread_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update thread counters")?;

        if updated.rows_affected() == 0 {
            bail!("Thread not found: {}", thread_id);
        }

        tx.commit().await.context("Failed to commit turn")?;

        Ok(MessageRecord {
            id: message_id,
            thread_id: thread_id.to_string(),
            role: MessageRole::Assistant,
            content: content.to_string(),
            reasoning: reasoning.map(str::to_string),
            evidence_ids: evidence_ids.to_vec(),
            created_at: now,
        })
    }
}
