use std::time::Duration;

use chrono::NaiveDate;
use domain::{Entry, FeedbackStatus};
use journal::JournalStore;
use uuid::Uuid;

fn sample_entry(owner: &str, date: NaiveDate) -> Entry {
    Entry::new(owner, date, 420.0, 35.5, 9.0, 6.5, 6, "Worked overtime.")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[tokio::test]
async fn test_entry_round_trip() {
    let store = JournalStore::in_memory().unwrap();
    let entry = sample_entry("alice", date(2025, 10, 21));
    store.create_entry(&entry).await.unwrap();

    let loaded = store.get_entry(&entry.id).await.unwrap().expect("entry exists");
    assert_eq!(loaded, entry);

    let by_date = store
        .get_entry_by_date("alice", date(2025, 10, 21))
        .await
        .unwrap()
        .expect("entry found by date");
    assert_eq!(by_date.id, entry.id);
}

#[tokio::test]
async fn test_owner_date_uniqueness() {
    let store = JournalStore::in_memory().unwrap();
    let day = date(2025, 10, 21);
    store.create_entry(&sample_entry("alice", day)).await.unwrap();

    // Same owner, same day: rejected.
    assert!(store.create_entry(&sample_entry("alice", day)).await.is_err());
    // Different owner, same day: fine.
    store.create_entry(&sample_entry("bob", day)).await.unwrap();
}

#[tokio::test]
async fn test_list_entries_newest_first() {
    let store = JournalStore::in_memory().unwrap();
    for day in [date(2025, 10, 19), date(2025, 10, 21), date(2025, 10, 20)] {
        store.create_entry(&sample_entry("alice", day)).await.unwrap();
    }

    let listed = store.list_entries("alice", 2).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].date, date(2025, 10, 21));
    assert_eq!(listed[1].date, date(2025, 10, 20));
}

#[tokio::test]
async fn test_update_notes_touches_updated_at() {
    let store = JournalStore::in_memory().unwrap();
    let entry = sample_entry("alice", date(2025, 10, 21));
    store.create_entry(&entry).await.unwrap();

    store.update_notes(&entry.id, "Rested.").await.unwrap();
    let loaded = store.get_entry(&entry.id).await.unwrap().unwrap();
    assert_eq!(loaded.notes, "Rested.");
    assert!(loaded.updated_at >= entry.updated_at);

    assert!(store.update_notes(&Uuid::new_v4(), "ghost").await.is_err());
}

#[tokio::test]
async fn test_feedback_pending_then_completed() {
    let store = JournalStore::in_memory().unwrap();
    let entry = sample_entry("alice", date(2025, 10, 21));
    store.create_entry(&entry).await.unwrap();

    assert!(store.get_feedback(&entry.id).await.unwrap().is_none());

    let pending = store.upsert_pending_feedback(&entry.id).await.unwrap();
    assert_eq!(pending.status, FeedbackStatus::Pending);
    assert!(pending.content.is_empty());
    assert!(pending.error_message.is_empty());

    store
        .complete_feedback(
            &entry.id,
            "Great work today!",
            "anthropic",
            "claude-3-5-haiku-latest",
            Some(42),
            Duration::from_millis(1200),
        )
        .await
        .unwrap();

    let done = store.get_feedback(&entry.id).await.unwrap().unwrap();
    assert_eq!(done.status, FeedbackStatus::Completed);
    assert_eq!(done.content, "Great work today!");
    assert_eq!(done.provider, "anthropic");
    assert_eq!(done.tokens_used, Some(42));
    assert_eq!(done.generation_time, Some(Duration::from_millis(1200)));
    assert!(done.error_message.is_empty());
    // The row identity survives the transition.
    assert_eq!(done.id, pending.id);
}

#[tokio::test]
async fn test_feedback_failed_state() {
    let store = JournalStore::in_memory().unwrap();
    let entry = sample_entry("alice", date(2025, 10, 21));
    store.create_entry(&entry).await.unwrap();
    store.upsert_pending_feedback(&entry.id).await.unwrap();

    store
        .fail_feedback(&entry.id, "openai: request timed out")
        .await
        .unwrap();

    let failed = store.get_feedback(&entry.id).await.unwrap().unwrap();
    assert_eq!(failed.status, FeedbackStatus::Failed);
    assert!(failed.content.is_empty());
    assert_eq!(failed.error_message, "openai: request timed out");
    assert!(failed.tokens_used.is_none());
}

#[tokio::test]
async fn test_regeneration_resets_terminal_row() {
    let store = JournalStore::in_memory().unwrap();
    let entry = sample_entry("alice", date(2025, 10, 21));
    store.create_entry(&entry).await.unwrap();
    let first = store.upsert_pending_feedback(&entry.id).await.unwrap();
    store
        .fail_feedback(&entry.id, "groq: connection refused")
        .await
        .unwrap();

    // Regeneration re-enters pending and discards the prior error.
    let again = store.upsert_pending_feedback(&entry.id).await.unwrap();
    assert_eq!(again.status, FeedbackStatus::Pending);
    assert!(again.error_message.is_empty());
    assert_eq!(again.id, first.id);
    assert_eq!(again.created_at, first.created_at);
}

#[tokio::test]
async fn test_terminal_writes_guard_invariants() {
    let store = JournalStore::in_memory().unwrap();
    let entry = sample_entry("alice", date(2025, 10, 21));
    store.create_entry(&entry).await.unwrap();
    store.upsert_pending_feedback(&entry.id).await.unwrap();

    // completed with empty content and failed with empty message are both
    // contract violations the store refuses to persist.
    assert!(store
        .complete_feedback(&entry.id, "", "openai", "gpt-4o-mini", None, Duration::ZERO)
        .await
        .is_err());
    assert!(store.fail_feedback(&entry.id, "").await.is_err());

    // And transitions on entries that never requested feedback are errors.
    let other = sample_entry("bob", date(2025, 10, 21));
    store.create_entry(&other).await.unwrap();
    assert!(store
        .complete_feedback(&other.id, "hi", "openai", "gpt-4o-mini", None, Duration::ZERO)
        .await
        .is_err());
}

#[tokio::test]
async fn test_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.db");

    let entry = sample_entry("alice", date(2025, 10, 21));
    {
        let store = JournalStore::open(&path).unwrap();
        store.create_entry(&entry).await.unwrap();
        store.upsert_pending_feedback(&entry.id).await.unwrap();
    }

    let store = JournalStore::open(&path).unwrap();
    assert!(store.get_entry(&entry.id).await.unwrap().is_some());
    let feedback = store.get_feedback(&entry.id).await.unwrap().unwrap();
    assert_eq!(feedback.status, FeedbackStatus::Pending);
}
