use notekeep_core::{Note, NoteRepository, NoteStore, Snapshot, SqliteNoteStore, StoreError};
use rusqlite::Connection;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

fn ids(snapshot: &Snapshot) -> Vec<Uuid> {
    snapshot.iter().map(|note| note.id).collect()
}

#[test]
fn store_publishes_full_snapshot_after_each_mutation() {
    let store = SqliteNoteStore::open_in_memory().unwrap();
    let mut subscription = store.get_all().unwrap();
    assert!(subscription.try_recv().unwrap().is_empty());

    let a = Note::new("Groceries", "Milk");
    let b = Note::new("Call mom", "Sunday");

    store.insert(&a).unwrap();
    assert_eq!(ids(&subscription.try_recv().unwrap()), [a.id]);

    store.insert(&b).unwrap();
    assert_eq!(ids(&subscription.try_recv().unwrap()), [a.id, b.id]);

    store.delete_by_id(&a).unwrap();
    assert_eq!(ids(&subscription.try_recv().unwrap()), [b.id]);

    store.delete_all().unwrap();
    assert!(subscription.try_recv().unwrap().is_empty());
    assert!(subscription.try_recv().is_none());
}

#[test]
fn statements_that_change_nothing_publish_nothing() {
    let store = SqliteNoteStore::open_in_memory().unwrap();
    let mut subscription = store.get_all().unwrap();
    subscription.try_recv().unwrap();

    store.delete_by_id(&Note::new("absent", "")).unwrap();
    store.delete_all().unwrap();

    assert!(subscription.try_recv().is_none());
}

#[test]
fn late_subscriber_starts_from_current_collection() {
    let store = SqliteNoteStore::open_in_memory().unwrap();
    let note = Note::new("existing", "");
    store.insert(&note).unwrap();

    let mut subscription = store.get_all().unwrap();
    assert_eq!(ids(&subscription.try_recv().unwrap()), [note.id]);
}

#[test]
fn explicit_unsubscribe_stops_delivery() {
    let store = SqliteNoteStore::open_in_memory().unwrap();
    let mut kept = store.get_all().unwrap();
    let mut released = store.get_all().unwrap();
    assert_eq!(store.subscriber_count(), 2);

    assert!(store.unsubscribe(released.id()));
    assert!(!store.unsubscribe(released.id()));
    assert_eq!(store.subscriber_count(), 1);

    store.insert(&Note::new("after release", "")).unwrap();

    assert!(released.try_recv().unwrap().is_empty());
    assert!(released.blocking_recv().is_none());
    kept.try_recv().unwrap();
    assert_eq!(kept.try_recv().unwrap().len(), 1);

    drop(kept);
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn concurrent_writers_are_observed_in_commit_order() {
    let store = Arc::new(SqliteNoteStore::open_in_memory().unwrap());
    let mut subscription = store.get_all().unwrap();

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for idx in 0..10 {
                    store
                        .insert(&Note::new(format!("w{worker}-{idx}"), ""))
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let mut sizes = Vec::new();
    while let Some(snapshot) = subscription.try_recv() {
        sizes.push(snapshot.len());
    }
    assert_eq!(sizes, (0..=40).collect::<Vec<_>>());
}

#[test]
fn repository_suppresses_identical_consecutive_snapshots() {
    let repo = NoteRepository::new(SqliteNoteStore::open_in_memory().unwrap());
    let mut stream = repo.get_all_notes().unwrap();
    assert!(stream.try_next().unwrap().is_empty());

    let note = Note::new("Groceries", "Milk");
    repo.add_note(&note).unwrap();
    repo.add_note(&note).unwrap();
    repo.update_note(&note).unwrap();

    assert_eq!(ids(&stream.try_next().unwrap()), [note.id]);
    assert!(stream.try_next().is_none());

    let revised = note.revised("Groceries", "Milk, bread");
    repo.update_note(&revised).unwrap();
    assert_eq!(stream.try_next().unwrap().as_ref(), &[revised]);
}

#[test]
fn repository_forwards_empty_snapshots() {
    let repo = NoteRepository::new(SqliteNoteStore::open_in_memory().unwrap());
    let note = Note::new("short lived", "");
    repo.add_note(&note).unwrap();

    let mut stream = repo.get_all_notes().unwrap();
    assert_eq!(stream.try_next().unwrap().len(), 1);

    repo.delete_note(&note).unwrap();
    repo.delete_note(&note).unwrap();
    assert!(stream.try_next().unwrap().is_empty());
    assert!(stream.try_next().is_none());
}

#[test]
fn repository_passes_store_errors_through() {
    let repo = NoteRepository::new(SqliteNoteStore::open_in_memory().unwrap());
    let note = Note::new("gone", "");
    repo.add_note(&note).unwrap();
    repo.clear_notes().unwrap();

    let err = repo.get_note(note.id).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(id) if id == note.id));
}

#[test]
fn storage_failures_pass_through_without_publishing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");
    let repo = NoteRepository::new(SqliteNoteStore::open(&path).unwrap());
    let mut stream = repo.get_all_notes().unwrap();
    assert!(stream.try_next().unwrap().is_empty());

    Connection::open(&path)
        .unwrap()
        .execute_batch("DROP TABLE notes_tbl;")
        .unwrap();

    let err = repo.add_note(&Note::new("lost", "")).unwrap_err();
    assert!(matches!(err, StoreError::Storage(_)));
    assert!(stream.try_next().is_none());
}

#[test]
fn repository_release_ends_stream() {
    let store = Arc::new(SqliteNoteStore::open_in_memory().unwrap());
    let repo = NoteRepository::new(Arc::clone(&store));
    let mut stream = repo.get_all_notes().unwrap();

    assert!(repo.release(stream.id()));
    assert_eq!(store.subscriber_count(), 0);
    assert!(stream.blocking_next().unwrap().is_empty());
    assert!(stream.blocking_next().is_none());
}

#[tokio::test]
async fn stream_delivers_to_async_consumer() {
    let repo = NoteRepository::new(SqliteNoteStore::open_in_memory().unwrap());
    let mut stream = repo.get_all_notes().unwrap();

    let reader = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(snapshot) = stream.next().await {
            seen.push(snapshot.len());
            if snapshot.len() == 2 {
                break;
            }
        }
        seen
    });

    repo.add_note(&Note::new("first", "")).unwrap();
    repo.add_note(&Note::new("second", "")).unwrap();

    let seen = tokio::time::timeout(Duration::from_secs(5), reader)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen, [0, 1, 2]);
}
