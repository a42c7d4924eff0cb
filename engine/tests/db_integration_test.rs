//! Integration tests for SQLite persistence
//!
//! Validates thread/message/evidence invariants against a real
//! temporary database: append-only messages, global evidence
//! deduplication, the atomic turn commit, and the cascade behavior of
//! thread deletion.

use finchat_engine::db::{Database, InsertOutcome, SkipReason};
use finchat_engine::search::SearchResult;
use tempfile::TempDir;

async fn setup() -> (TempDir, Database) {
    let temp = TempDir::new().unwrap();
    let db = Database::new(&temp.path().join("test.db")).await.unwrap();
    (temp, db)
}

fn result(url: &str, title: &str) -> SearchResult {
    SearchResult {
        url: url.to_string(),
        title: title.to_string(),
        snippet: "snippet".to_string(),
    }
}

#[tokio::test]
async fn test_thread_lifecycle() {
    let (_temp, db) = setup().await;
    let threads = db.threads();

    let thread = threads.create("user-1", Some("Rates discussion")).await.unwrap();
    assert_eq!(thread.title, "Rates discussion");
    assert_eq!(thread.message_count, 0);

    let fetched = threads.get(&thread.id).await.unwrap().unwrap();
    assert_eq!(fetched.user_id, "user-1");

    let listed = threads.list_for_user("user-1").await.unwrap();
    assert_eq!(listed.len(), 1);

    assert!(threads.delete(&thread.id).await.unwrap());
    assert!(threads.get(&thread.id).await.unwrap().is_none());

    // Deleting again reports nothing removed
    assert!(!threads.delete(&thread.id).await.unwrap());
}

#[tokio::test]
async fn test_default_thread_title() {
    let (_temp, db) = setup().await;

    let thread = db.threads().create("user-1", None).await.unwrap();
    assert_eq!(thread.title, "New Chat");
}

#[tokio::test]
async fn test_user_message_is_standalone_write() {
    let (_temp, db) = setup().await;
    let thread = db.threads().create("user-1", None).await.unwrap();

    let message = db
        .messages()
        .create_user_message(&thread.id, "hello")
        .await
        .unwrap();

    assert!(message.reasoning.is_none());
    assert!(message.evidence_ids.is_empty());

    // The user-message write does not touch thread counters
    let fetched = db.threads().get(&thread.id).await.unwrap().unwrap();
    assert_eq!(fetched.message_count, 0);
    assert_eq!(db.messages().count(&thread.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_recent_is_newest_first_and_bounded() {
    let (_temp, db) = setup().await;
    let thread = db.threads().create("user-1", None).await.unwrap();
    let messages = db.messages();

    for i in 0..12 {
        messages
            .create_user_message(&thread.id, &format!("m{}", i))
            .await
            .unwrap();
    }

    let recent = messages.recent(&thread.id, 10).await.unwrap();
    assert_eq!(recent.len(), 10);
    assert_eq!(recent.first().unwrap().content, "m11");
    assert_eq!(recent.last().unwrap().content, "m2");

    // Strictly non-increasing creation order, newest first
    for pair in recent.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
}

#[tokio::test]
async fn test_commit_assistant_turn_updates_counters() {
    let (_temp, db) = setup().await;
    let thread = db.threads().create("user-1", None).await.unwrap();

    db.messages()
        .create_user_message(&thread.id, "what moved the market?")
        .await
        .unwrap();

    let outcomes = db
        .evidence()
        .record(
            &thread.id,
            &[result("https://example.com/a", "A"), result("https://example.com/b", "B")],
        )
        .await
        .unwrap();
    let ids: Vec<String> = outcomes
        .iter()
        .filter_map(|o| o.as_inserted())
        .map(|r| r.id.clone())
        .collect();
    assert_eq!(ids.len(), 2);

    let assistant = db
        .threads()
        .commit_assistant_turn(&thread.id, "the reply", Some("trace"), &ids)
        .await
        .unwrap();

    assert_eq!(assistant.evidence_ids.len(), 2);
    assert_eq!(assistant.reasoning.as_deref(), Some("trace"));

    // One completed turn moves the counter by exactly 2
    let fetched = db.threads().get(&thread.id).await.unwrap().unwrap();
    assert_eq!(fetched.message_count, 2);
    assert!(fetched.last_message_at >= thread.last_message_at);

    // Citation order survives the round trip
    let listed = db.messages().list(&thread.id).await.unwrap();
    let stored = listed.last().unwrap();
    assert_eq!(stored.evidence_ids, ids);
}

#[tokio::test]
async fn test_commit_assistant_turn_unknown_thread_fails() {
    let (_temp, db) = setup().await;

    let result = db
        .threads()
        .commit_assistant_turn("no-such-thread", "reply", None, &[])
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_evidence_dedup_within_thread() {
    let (_temp, db) = setup().await;
    let thread = db.threads().create("user-1", None).await.unwrap();
    let store = db.evidence();

    let candidates = vec![
        result("https://example.com/article", "First"),
        result("https://example.com/article", "Duplicate"),
    ];

    let outcomes = store.record(&thread.id, &candidates).await.unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0], InsertOutcome::Inserted(_)));
    assert!(matches!(
        outcomes[1],
        InsertOutcome::Skipped { reason: SkipReason::DuplicateUrl, .. }
    ));

    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_evidence_dedup_across_threads() {
    let (_temp, db) = setup().await;
    let store = db.evidence();

    let thread_a = db.threads().create("user-1", None).await.unwrap();
    let thread_b = db.threads().create("user-2", None).await.unwrap();

    let first = store
        .record(&thread_a.id, &[result("https://example.com/shared", "Shared")])
        .await
        .unwrap();
    assert!(matches!(first[0], InsertOutcome::Inserted(_)));

    // Same URL from a different thread: zero new rows, not an error
    let second = store
        .record(&thread_b.id, &[result("https://example.com/shared", "Shared")])
        .await
        .unwrap();
    assert!(second[0].as_inserted().is_none());

    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_thread_delete_cascades_messages_but_orphans_evidence() {
    let (_temp, db) = setup().await;
    let thread = db.threads().create("user-1", None).await.unwrap();

    db.messages()
        .create_user_message(&thread.id, "stock news?")
        .await
        .unwrap();

    let outcomes = db
        .evidence()
        .record(&thread.id, &[result("https://example.com/orphan", "Orphan")])
        .await
        .unwrap();
    let ids: Vec<String> = outcomes
        .iter()
        .filter_map(|o| o.as_inserted())
        .map(|r| r.id.clone())
        .collect();

    db.threads()
        .commit_assistant_turn(&thread.id, "reply", Some("trace"), &ids)
        .await
        .unwrap();

    db.threads().delete(&thread.id).await.unwrap();

    // Messages are gone with the thread
    assert_eq!(db.messages().count(&thread.id).await.unwrap(), 0);

    // The evidence row survives: the dedup store is thread-agnostic
    assert_eq!(db.evidence().count().await.unwrap(), 1);
    assert!(db.evidence().get(&ids[0]).await.unwrap().is_some());
}

#[tokio::test]
async fn test_get_many_preserves_order_and_skips_unresolved() {
    let (_temp, db) = setup().await;
    let thread = db.threads().create("user-1", None).await.unwrap();
    let store = db.evidence();

    let outcomes = store
        .record(
            &thread.id,
            &[result("https://example.com/1", "One"), result("https://example.com/2", "Two")],
        )
        .await
        .unwrap();
    let mut ids: Vec<String> = outcomes
        .iter()
        .filter_map(|o| o.as_inserted())
        .map(|r| r.id.clone())
        .collect();
    ids.push("dangling-id".to_string());

    let records = store.get_many(&ids).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "One");
    assert_eq!(records[1].title, "Two");
}
