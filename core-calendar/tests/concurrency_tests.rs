//! Concurrent write tests
//!
//! Two devices are simulated either by injecting a foreign write between
//! our read and our write, or by running two independent stores against the
//! same blob store.

mod common;

use chrono::{TimeZone, Utc};
use common::{fast_settings, store, store_with, MemoryBlobStore};
use core_calendar::{CalendarError, EventInput, RemoteEventStore};
use core_runtime::config::ConcurrencyMode;
use std::collections::HashSet;
use std::sync::Arc;

fn event(title: &str) -> EventInput {
    EventInput::new(title, Utc.with_ymd_and_hms(2024, 5, 20, 14, 0, 0).unwrap())
}

const FOREIGN_ONE: &str =
    r#"[{"id": "phone-1", "title": "Dentist", "date": "2024-05-21T08:00:00.000Z"}]"#;
const FOREIGN_TWO: &str = r#"[
    {"id": "phone-1", "title": "Dentist", "date": "2024-05-21T08:00:00.000Z"},
    {"id": "phone-2", "title": "Gym", "date": "2024-05-22T18:00:00.000Z"}
]"#;
const FOREIGN_THREE: &str = r#"[
    {"id": "phone-1", "title": "Dentist", "date": "2024-05-21T08:00:00.000Z"},
    {"id": "phone-2", "title": "Gym", "date": "2024-05-22T18:00:00.000Z"},
    {"id": "phone-3", "title": "Call mum", "date": "2024-05-23T19:00:00.000Z"}
]"#;

fn ids(events: &[core_calendar::CalendarEvent]) -> HashSet<String> {
    events.iter().map(|e| e.id.clone()).collect()
}

#[tokio::test]
async fn test_conditional_conflict_is_retried() {
    let blobs = MemoryBlobStore::new();
    blobs.seed("[]").await;
    blobs.push_foreign_write(FOREIGN_ONE).await;
    let store = store(blobs.clone());

    let created = store.add(event("Review")).await.unwrap();

    let events = store.list().await.unwrap();
    assert_eq!(
        ids(&events),
        HashSet::from(["phone-1".to_string(), created.id])
    );
    let counts = blobs.counts().await;
    assert_eq!(counts.writes, 2);
    assert_eq!(counts.conditional_writes, 2);
}

#[tokio::test]
async fn test_conflict_surfaces_after_attempt_bound() {
    let blobs = MemoryBlobStore::new();
    blobs.seed("[]").await;
    blobs.push_foreign_write(FOREIGN_ONE).await;
    blobs.push_foreign_write(FOREIGN_TWO).await;
    blobs.push_foreign_write(FOREIGN_THREE).await;
    let store = store(blobs.clone());

    let error = store.add(event("Review")).await.unwrap_err();

    assert!(matches!(error, CalendarError::WriteConflict { attempts: 3 }));
    assert!(error.user_message().contains("another device"));

    // Nothing of ours landed; the other device's data is intact.
    let events = store.list().await.unwrap();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.id.starts_with("phone-")));
}

#[tokio::test]
async fn test_attempt_bound_is_configurable() {
    let blobs = MemoryBlobStore::new();
    blobs.seed("[]").await;
    blobs.push_foreign_write(FOREIGN_ONE).await;
    let store = store_with(blobs.clone(), fast_settings().with_max_write_attempts(1));

    let error = store.add(event("Review")).await.unwrap_err();

    assert!(matches!(error, CalendarError::WriteConflict { attempts: 1 }));
    assert_eq!(blobs.counts().await.writes, 1);
}

#[tokio::test]
async fn test_remove_conflict_keeps_foreign_addition() {
    let blobs = MemoryBlobStore::new();
    blobs.seed(FOREIGN_ONE).await;
    blobs.push_foreign_write(FOREIGN_TWO).await;
    let store = store(blobs.clone());

    store.remove("phone-1").await.unwrap();

    let events = store.list().await.unwrap();
    assert_eq!(ids(&events), HashSet::from(["phone-2".to_string()]));
}

#[tokio::test]
async fn test_heuristic_detects_changed_ids() {
    let blobs = MemoryBlobStore::without_conditional_writes();
    blobs.seed("[]").await;
    // Read 1 is our snapshot, read 2 the check right before writing.
    blobs.push_foreign_write_before_read(2, FOREIGN_ONE).await;
    let store = store(blobs.clone());

    let created = store.add(event("Review")).await.unwrap();

    let events = store.list().await.unwrap();
    assert_eq!(
        ids(&events),
        HashSet::from(["phone-1".to_string(), created.id])
    );
    let counts = blobs.counts().await;
    assert_eq!(counts.writes, 1);
    assert_eq!(counts.conditional_writes, 0);
}

#[tokio::test]
async fn test_heuristic_mode_can_be_forced() {
    let blobs = MemoryBlobStore::new();
    blobs.seed("[]").await;
    let store = store_with(
        blobs.clone(),
        fast_settings().with_concurrency_mode(ConcurrencyMode::Heuristic),
    );

    store.add(event("Review")).await.unwrap();

    let counts = blobs.counts().await;
    assert_eq!(counts.writes, 1);
    assert_eq!(counts.conditional_writes, 0);
    // snapshot read, pre-write check, no more
    assert_eq!(counts.reads, 2);
}

#[tokio::test]
async fn test_heuristic_misses_edits_that_keep_ids() {
    let blobs = MemoryBlobStore::without_conditional_writes();
    blobs.seed(FOREIGN_ONE).await;
    blobs
        .push_foreign_write_before_read(
            2,
            r#"[{"id": "phone-1", "title": "Dentist (moved)", "date": "2024-05-24T08:00:00.000Z"}]"#,
        )
        .await;
    let store = store(blobs.clone());

    store.add(event("Review")).await.unwrap();

    let events = store.list().await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].title, "Dentist");
}

async fn race_two_devices(blobs: Arc<MemoryBlobStore>, attempts: u32) {
    blobs.seed("[]").await;
    let laptop: RemoteEventStore =
        store_with(blobs.clone(), fast_settings().with_max_write_attempts(attempts));
    let phone: RemoteEventStore =
        store_with(blobs.clone(), fast_settings().with_max_write_attempts(attempts));

    let (a, b) = tokio::join!(laptop.add(event("Laptop")), phone.add(event("Phone")));

    let mut stored = Vec::new();
    let mut conflicts = 0;
    for outcome in [a, b] {
        match outcome {
            Ok(event) => stored.push(event.id),
            Err(CalendarError::WriteConflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert!(
        stored.len() == 2 || (stored.len() == 1 && conflicts == 1),
        "stored {stored:?}, conflicts {conflicts}"
    );

    let listed = ids(&laptop.list().await.unwrap());
    assert_eq!(listed, stored.into_iter().collect::<HashSet<_>>());
}

#[tokio::test]
async fn test_concurrent_adds_with_conditional_writes() {
    race_two_devices(MemoryBlobStore::new(), 3).await;
}

#[tokio::test]
async fn test_concurrent_adds_without_retries() {
    race_two_devices(MemoryBlobStore::new(), 1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_across_threads() {
    let blobs = MemoryBlobStore::new();
    blobs.seed("[]").await;

    let mut handles = Vec::new();
    for device in 0..4 {
        let store = Arc::new(store_with(
            blobs.clone(),
            fast_settings().with_max_write_attempts(10),
        ));
        handles.push(tokio::spawn(async move {
            store.add(event(&format!("Device {device}"))).await
        }));
    }

    let mut stored = HashSet::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(event) => {
                stored.insert(event.id);
            }
            Err(CalendarError::WriteConflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    let listed = ids(&store(blobs).list().await.unwrap());
    assert_eq!(listed, stored);
}
