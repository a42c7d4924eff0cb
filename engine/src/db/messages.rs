/// Message persistence operations
///
/// Messages are append-only: created once, never mutated, never deleted
/// individually (only through the thread cascade). Ordering within a
/// thread is by creation time (milliseconds) with rowid as tiebreak.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::fmt;
use uuid::Uuid;

use super::now_millis;

/// Role of a message sender, a closed set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "assistant" => MessageRole::Assistant,
            _ => MessageRole::User,
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Message record
///
/// `reasoning` and `evidence_ids` are only ever populated for
/// assistant messages; user messages carry neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    pub content: String,
    pub reasoning: Option<String>,
    pub evidence_ids: Vec<String>,
    pub created_at: i64,
}

/// Message repository for database operations
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist an incoming user message
    ///
    /// This write is unconditional and stands alone: it happens before
    /// classification, so a turn that later fails still leaves the
    /// user's message visible in history.
    pub async fn create_user_message(&self, thread_id: &str, content: &str) -> Result<MessageRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_millis();

        sqlx::query(
            "INSERT INTO messages (id, thread_id, role, content, created_at)
             VALUES (?, ?, 'user', ?, ?)",
        )
        .bind(&id)
        .bind(thread_id)
        .bind(content)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to persist user message")?;

        Ok(MessageRecord {
            id,
            thread_id: thread_id.to_string(),
            role: MessageRole::User,
            content: content.to_string(),
            reasoning: None,
            evidence_ids: Vec::new(),
            created_at: now,
        })
    }

    /// Fetch the most recent messages of a thread, newest first
    ///
    /// Bounded-cost retrieval for the context window builder; callers
    /// reverse the result to restore chronological order.
    pub async fn recent(&self, thread_id: &str, limit: i64) -> Result<Vec<MessageRecord>> {
        let rows = sqlx::query(
            "SELECT id, thread_id, role, content, reasoning, created_at
             FROM messages WHERE thread_id = ?
             ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(thread_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent messages")?;

        Ok(rows.into_iter().map(Self::row_to_record).collect())
    }

    /// Fetch the full history of a thread in chronological order,
    /// with each assistant message's evidence references attached.
    pub async fn list(&self, thread_id: &str) -> Result<Vec<MessageRecord>> {
        let rows = sqlx::query(
            "SELECT id, thread_id, role, content, reasoning, created_at
             FROM messages WHERE thread_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch messages")?;

        let mut records: Vec<MessageRecord> = rows.into_iter().map(Self::row_to_record).collect();

        for record in &mut records {
            if record.role == MessageRole::Assistant {
                record.evidence_ids = self.evidence_ids_for(&record.id).await?;
            }
        }

        Ok(records)
    }

    /// Count messages in a thread
    pub async fn count(&self, thread_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count messages")?;

        Ok(count)
    }

    /// Evidence ids cited by a message, in citation order
    pub async fn evidence_ids_for(&self, message_id: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT evidence_id FROM message_evidence
             WHERE message_id = ? ORDER BY position ASC",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch evidence references")?;

        Ok(ids)
    }

    fn row_to_record(r: sqlx::sqlite::SqliteRow) -> MessageRecord {
        MessageRecord {
            id: r.get("id"),
            thread_id: r.get("thread_id"),
            role: MessageRole::parse(&r.get::<String, _>("role")),
            content: r.get("content"),
            reasoning: r.get("reasoning"),
            evidence_ids: Vec::new(),
            created_at: r.get("created_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(MessageRole::parse("user"), MessageRole::User);
        assert_eq!(MessageRole::parse("assistant"), MessageRole::Assistant);
        assert_eq!(MessageRole::User.as_str(), "user");
        assert_eq!(MessageRole::Assistant.to_string(), "assistant");
    }
}
