//! Consumer-side note feed.
//!
//! # Responsibility
//! - Hold the latest collection state for a presentation layer.
//! - Apply the configurable empty-snapshot policy.
//! - Pump a `NoteStream` from an async task or a background thread.
//!
//! # Invariants
//! - The feed starts with an empty collection.
//! - Under `EmptySnapshotPolicy::Ignore`, empty snapshots never replace state.
//! - Watchers are only notified when the held collection actually changes.

use crate::model::note::{snapshot_of, Snapshot};
use crate::repo::note_repository::NoteStream;
use crate::sync::hub::SubscriptionCloser;
use log::debug;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::watch;

const FEED_THREAD_NAME: &str = "notekeep-feed";

/// What a feed does with an empty snapshot.
///
/// `Ignore` keeps the previous collection visible, which avoids flashing an
/// empty list while storage is still opening. `Forward` applies it like any
/// other snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySnapshotPolicy {
    #[default]
    Ignore,
    Forward,
}

/// Unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePolicyError(String);

impl Display for ParsePolicyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported empty snapshot policy `{}`; expected ignore|forward",
            self.0
        )
    }
}

impl Error for ParsePolicyError {}

impl FromStr for EmptySnapshotPolicy {
    type Err = ParsePolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "forward" => Ok(Self::Forward),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

/// Latest-value holder fed by a repository stream.
#[derive(Debug)]
pub struct NoteFeed {
    policy: EmptySnapshotPolicy,
    state: watch::Sender<Snapshot>,
}

impl NoteFeed {
    pub fn new(policy: EmptySnapshotPolicy) -> Self {
        let (state, _) = watch::channel(snapshot_of(Vec::new()));
        Self { policy, state }
    }

    pub fn policy(&self) -> EmptySnapshotPolicy {
        self.policy
    }

    /// Applies one snapshot. Returns whether the held state changed.
    pub fn apply(&self, snapshot: Snapshot) -> bool {
        if snapshot.is_empty() && self.policy == EmptySnapshotPolicy::Ignore {
            debug!("event=feed_apply module=feed status=skipped reason=empty_snapshot");
            return false;
        }

        let notes = snapshot.len();
        let changed = self.state.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
        if changed {
            debug!("event=feed_apply module=feed status=ok notes={notes}");
        }
        changed
    }

    /// Returns the held collection.
    pub fn current(&self) -> Snapshot {
        Arc::clone(&*self.state.borrow())
    }

    /// Returns a receiver notified on every state change.
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    /// Applies snapshots from `stream` until it is released.
    pub async fn run(&self, mut stream: NoteStream) {
        while let Some(snapshot) = stream.next().await {
            self.apply(snapshot);
        }
    }

    /// Pumps `stream` into this feed on a dedicated thread.
    ///
    /// # Errors
    /// - Returns an error when the OS refuses to spawn the thread.
    pub fn spawn(self: Arc<Self>, stream: NoteStream) -> std::io::Result<FeedHandle> {
        let closer = stream.closer();
        let join = thread::Builder::new()
            .name(FEED_THREAD_NAME.to_string())
            .spawn(move || {
                let mut stream = stream;
                while let Some(snapshot) = stream.blocking_next() {
                    self.apply(snapshot);
                }
                debug!("event=feed_stop module=feed status=ok");
            })?;

        Ok(FeedHandle { closer, join })
    }
}

impl Default for NoteFeed {
    fn default() -> Self {
        Self::new(EmptySnapshotPolicy::default())
    }
}

/// Control handle for a feed pump thread.
#[derive(Debug)]
pub struct FeedHandle {
    closer: SubscriptionCloser,
    join: JoinHandle<()>,
}

impl FeedHandle {
    /// Releases the stream and waits for the pump thread to exit.
    pub fn stop(self) -> thread::Result<()> {
        self.closer.close();
        self.join.join()
    }
}

#[cfg(test)]
mod tests {
    use super::{EmptySnapshotPolicy, NoteFeed};
    use crate::model::note::{snapshot_of, Note};

    #[test]
    fn ignore_policy_keeps_previous_state_on_empty_snapshot() {
        let feed = NoteFeed::new(EmptySnapshotPolicy::Ignore);
        let note = Note::new("Groceries", "Milk");

        assert!(feed.apply(snapshot_of(vec![note.clone()])));
        assert!(!feed.apply(snapshot_of(Vec::new())));
        assert_eq!(&*feed.current(), &[note]);
    }

    #[test]
    fn forward_policy_applies_empty_snapshot() {
        let feed = NoteFeed::new(EmptySnapshotPolicy::Forward);
        let note = Note::new("Groceries", "Milk");

        assert!(feed.apply(snapshot_of(vec![note])));
        assert!(feed.apply(snapshot_of(Vec::new())));
        assert!(feed.current().is_empty());
    }

    #[test]
    fn identical_snapshot_does_not_notify_watchers() {
        let feed = NoteFeed::default();
        let mut watcher = feed.watch();
        let note = Note::new("a", "b");

        assert!(feed.apply(snapshot_of(vec![note.clone()])));
        assert!(watcher.has_changed().unwrap());
        watcher.borrow_and_update();

        assert!(!feed.apply(snapshot_of(vec![note])));
        assert!(!watcher.has_changed().unwrap());
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!(
            " Forward ".parse::<EmptySnapshotPolicy>().unwrap(),
            EmptySnapshotPolicy::Forward
        );
        assert!("drop".parse::<EmptySnapshotPolicy>().is_err());
    }
}
