use notekeep_core::{
    EmptySnapshotPolicy, Note, NoteFeed, NoteRepository, Snapshot, SqliteNoteStore,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_for(feed: &NoteFeed, done: impl Fn(&Snapshot) -> bool) -> Snapshot {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let current = feed.current();
        if done(&current) {
            return current;
        }
        assert!(
            Instant::now() < deadline,
            "feed did not reach expected state"
        );
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn spawned_feed_tracks_repository_and_stops_cleanly() {
    let store = Arc::new(SqliteNoteStore::open_in_memory().unwrap());
    let repo = NoteRepository::new(Arc::clone(&store));
    let feed = Arc::new(NoteFeed::new(EmptySnapshotPolicy::Ignore));
    let handle = Arc::clone(&feed)
        .spawn(repo.get_all_notes().unwrap())
        .unwrap();

    let a = Note::new("Groceries", "Milk");
    repo.add_note(&a).unwrap();
    let current = wait_for(&feed, |notes| notes.len() == 1);
    assert_eq!(current[0], a);

    repo.clear_notes().unwrap();
    let b = Note::new("Call mom", "Sunday");
    repo.add_note(&b).unwrap();
    let current = wait_for(&feed, |notes| notes.first() == Some(&b));
    assert_eq!(current.len(), 1);

    handle.stop().unwrap();
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn ignore_policy_keeps_last_collection_after_clear() {
    let repo = NoteRepository::new(SqliteNoteStore::open_in_memory().unwrap());
    let feed = NoteFeed::new(EmptySnapshotPolicy::Ignore);
    let mut stream = repo.get_all_notes().unwrap();

    let note = Note::new("keep visible", "");
    repo.add_note(&note).unwrap();
    repo.clear_notes().unwrap();

    while let Some(snapshot) = stream.try_next() {
        feed.apply(snapshot);
    }
    assert_eq!(feed.current().as_ref(), &[note]);
}

#[tokio::test]
async fn async_feed_notifies_watchers() {
    let repo = NoteRepository::new(SqliteNoteStore::open_in_memory().unwrap());
    let feed = Arc::new(NoteFeed::new(EmptySnapshotPolicy::Forward));
    let mut watcher = feed.watch();
    let stream = repo.get_all_notes().unwrap();
    let closer = stream.closer();

    let pump = tokio::spawn({
        let feed = Arc::clone(&feed);
        async move { feed.run(stream).await }
    });

    let note = Note::new("Groceries", "Milk");
    repo.add_note(&note).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            watcher.changed().await.unwrap();
            if !watcher.borrow_and_update().is_empty() {
                break;
            }
        }
    })
    .await
    .unwrap();

    repo.clear_notes().unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            watcher.changed().await.unwrap();
            if watcher.borrow_and_update().is_empty() {
                break;
            }
        }
    })
    .await
    .unwrap();

    assert!(closer.close());
    pump.await.unwrap();
}
