//! Consumer-facing note repository.
//!
//! # Responsibility
//! - Expose verb-style mutations that delegate to a `NoteStore`.
//! - Expose the live collection with consecutive duplicates removed.
//!
//! # Invariants
//! - Store errors reach the caller unchanged; nothing is retried.
//! - De-duplication state is scoped to one `NoteStream`.
//! - Empty snapshots are forwarded; filtering them is consumer policy.

use crate::model::note::{Note, NoteId, Snapshot};
use crate::store::note_store::{NoteStore, StoreResult};
use crate::sync::hub::{Subscription, SubscriptionCloser, SubscriptionId};
use log::trace;
use std::sync::Arc;

/// Thin coordination layer between a store and its consumers.
#[derive(Debug)]
pub struct NoteRepository<S: NoteStore> {
    store: S,
}

impl<S: NoteStore> NoteRepository<S> {
    /// Creates a repository over the provided store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the wrapped store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Opens a de-duplicated live view of the whole collection.
    pub fn get_all_notes(&self) -> StoreResult<NoteStream> {
        Ok(NoteStream::new(self.store.get_all()?))
    }

    /// Gets one note by id.
    pub fn get_note(&self, id: NoteId) -> StoreResult<Note> {
        self.store.get_by_id(id)
    }

    pub fn add_note(&self, note: &Note) -> StoreResult<()> {
        self.store.insert(note)
    }

    pub fn update_note(&self, note: &Note) -> StoreResult<()> {
        self.store.update(note)
    }

    pub fn delete_note(&self, note: &Note) -> StoreResult<()> {
        self.store.delete_by_id(note)
    }

    /// Removes every note.
    pub fn clear_notes(&self) -> StoreResult<()> {
        self.store.delete_all()
    }

    /// Releases a stream opened by [`NoteRepository::get_all_notes`].
    pub fn release(&self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }
}

/// Live collection view that suppresses consecutive equal snapshots.
#[derive(Debug)]
pub struct NoteStream {
    subscription: Subscription,
    last: Option<Snapshot>,
}

impl NoteStream {
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            last: None,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.subscription.id()
    }

    /// Waits for the next snapshot that differs from the previous one.
    ///
    /// Returns `None` once the stream is released and drained.
    pub async fn next(&mut self) -> Option<Snapshot> {
        loop {
            let snapshot = self.subscription.recv().await?;
            if let Some(snapshot) = self.admit(snapshot) {
                return Some(snapshot);
            }
        }
    }

    /// Blocking variant of [`NoteStream::next`] for worker threads.
    ///
    /// # Panics
    /// - When called from within an asynchronous execution context.
    pub fn blocking_next(&mut self) -> Option<Snapshot> {
        loop {
            let snapshot = self.subscription.blocking_recv()?;
            if let Some(snapshot) = self.admit(snapshot) {
                return Some(snapshot);
            }
        }
    }

    /// Returns the next distinct buffered snapshot without waiting.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        while let Some(snapshot) = self.subscription.try_recv() {
            if let Some(snapshot) = self.admit(snapshot) {
                return Some(snapshot);
            }
        }
        None
    }

    /// The most recently emitted snapshot.
    pub fn last(&self) -> Option<&Snapshot> {
        self.last.as_ref()
    }

    pub fn closer(&self) -> SubscriptionCloser {
        self.subscription.closer()
    }

    /// Explicitly releases the underlying subscription.
    pub fn unsubscribe(self) {
        self.subscription.unsubscribe();
    }

    fn admit(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        if self.last.as_ref() == Some(&snapshot) {
            trace!(
                "event=snapshot_suppressed module=repo subscription={} notes={}",
                self.subscription.id(),
                snapshot.len()
            );
            return None;
        }
        self.last = Some(Arc::clone(&snapshot));
        Some(snapshot)
    }
}
