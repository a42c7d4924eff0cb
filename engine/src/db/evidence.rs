/// Evidence persistence operations
///
/// Evidence rows are deduplicated web sources keyed by a content hash
/// of their URL. The key is unique across the whole store, not per
/// thread: two threads researching the same URL collide and the second
/// write is dropped, not merged. Rows are created during retrieval and
/// never mutated or deleted; thread deletion leaves them behind.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::now_millis;
use crate::search::SearchResult;

/// Persisted evidence record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub id: String,
    pub thread_id: String,
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub url_hash: String,
    pub created_at: i64,
}

/// Why a candidate result was not persisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The URL's dedup key already exists somewhere in the store
    DuplicateUrl,
}

/// Outcome of one insert attempt
///
/// The duplicate-key swallow is a named branch rather than ambient
/// error suppression so callers and tests can see why a candidate was
/// dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted(EvidenceRecord),
    Skipped { url: String, reason: SkipReason },
}

impl InsertOutcome {
    /// The persisted record, if this attempt inserted one
    pub fn as_inserted(&self) -> Option<&EvidenceRecord> {
        match self {
            InsertOutcome::Inserted(record) => Some(record),
            InsertOutcome::Skipped { .. } => None,
        }
    }
}

/// Deterministic deduplication key for a URL: hex SHA-256.
pub fn dedup_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(digest)
}

/// Evidence store for database operations
pub struct EvidenceStore {
    pool: SqlitePool,
}

impl EvidenceStore {
    /// Create a new evidence store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a batch of search results for a thread
    ///
    /// Each candidate gets one insert attempt; a uniqueness violation
    /// on the dedup key becomes `Skipped { reason: DuplicateUrl }`,
    /// not retried and not an error. The outcome order matches the order
    /// attempts were made, so the inserted subsequence matches the
    /// order results were successfully written.
    pub async fn record(
        &self,
        thread_id: &str,
        results: &[SearchResult],
    ) -> Result<Vec<InsertOutcome>> {
        let mut outcomes = Vec::with_capacity(results.len());

        for result in results {
            outcomes.push(self.insert_one(thread_id, result).await?);
        }

        Ok(outcomes)
    }

    async fn insert_one(&self, thread_id: &str, result: &SearchResult) -> Result<InsertOutcome> {
        let id = Uuid::new_v4().to_string();
        let url_hash = dedup_key(&result.url);
        let now = now_millis();

        let insert = sqlx::query(
            "INSERT INTO evidence (id, thread_id, url, title, snippet, url_hash, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(thread_id)
        .bind(&result.url)
        .bind(&result.title)
        .bind(&result.snippet)
        .bind(&url_hash)
        .bind(now)
        .execute(&self.pool)
        .await;

        match insert {
            Ok(_) => Ok(InsertOutcome::Inserted(EvidenceRecord {
                id,
                thread_id: thread_id.to_string(),
                url: result.url.clone(),
                title: result.title.clone(),
                snippet: result.snippet.clone(),
                url_hash,
                created_at: now,
            })),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                debug!("Evidence already recorded, skipping: {}", result.url);
                Ok(InsertOutcome::Skipped {
                    url: result.url.clone(),
                    reason: SkipReason::DuplicateUrl,
                })
            }
            Err(e) => Err(e).context("Failed to insert evidence"),
        }
    }

    /// Get an evidence record by ID
    pub async fn get(&self, evidence_id: &str) -> Result<Option<EvidenceRecord>> {
        let row = sqlx::query(
            "SELECT id, thread_id, url, title, snippet, url_hash, created_at
             FROM evidence WHERE id = ?",
        )
        .bind(evidence_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch evidence")?;

        Ok(row.map(Self::row_to_record))
    }

    /// Fetch several evidence records by ID, preserving input order.
    ///
    /// Ids that no longer resolve are silently omitted: a citation may
    /// point at evidence recorded by another (even deleted) thread.
    pub async fn get_many(&self, evidence_ids: &[String]) -> Result<Vec<EvidenceRecord>> {
        let mut records = Vec::with_capacity(evidence_ids.len());
        for id in evidence_ids {
            if let Some(record) = self.get(id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Total number of evidence rows in the store
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM evidence")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count evidence")?;

        Ok(count)
    }

    fn row_to_record(r: sqlx::sqlite::SqliteRow) -> EvidenceRecord {
        EvidenceRecord {
            id: r.get("id"),
            thread_id: r.get("thread_id"),
            url: r.get("url"),
            title: r.get("title"),
            snippet: r.get("snippet"),
            url_hash: r.get("url_hash"),
            created_at: r.get("created_at"),
        }
    }
}
