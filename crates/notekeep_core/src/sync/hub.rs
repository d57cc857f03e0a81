//! Snapshot publish/subscribe hub.
//!
//! # Responsibility
//! - Hold one unbounded channel per active subscription.
//! - Deliver each published snapshot to every live subscription.
//! - Prune listeners whose receiving side is gone.
//!
//! # Invariants
//! - A new subscription's first message is the snapshot it was opened with.
//! - Releasing a subscription (explicitly or on drop) removes its sender, so
//!   the receiver drains what is buffered and then reports end-of-stream.
//! - Dropping the hub ends every subscription.

use crate::model::note::Snapshot;
use log::debug;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Registry {
    next_id: AtomicU64,
    subscribers: Mutex<BTreeMap<SubscriptionId, UnboundedSender<Snapshot>>>,
}

impl Registry {
    // The map stays structurally valid even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<SubscriptionId, UnboundedSender<Snapshot>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!("event=snapshot_unsubscribe module=sync status=ok subscription={id}");
        }
        removed
    }
}

/// Fan-out point for full-collection snapshots.
#[derive(Debug, Default)]
pub struct SnapshotHub {
    registry: Arc<Registry>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener whose first message is `initial`.
    pub fn subscribe(&self, initial: Snapshot) -> Subscription {
        let id = SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();
        // The receiver is alive in this scope, so this send cannot fail.
        let _ = sender.send(initial);
        let active = {
            let mut subscribers = self.registry.lock();
            subscribers.insert(id, sender);
            subscribers.len()
        };
        debug!("event=snapshot_subscribe module=sync status=ok subscription={id} active={active}");

        Subscription {
            id,
            receiver,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Delivers `snapshot` to every live listener.
    ///
    /// Returns the number of listeners that received it. Listeners whose
    /// receiver was dropped are removed.
    pub fn publish(&self, snapshot: &Snapshot) -> usize {
        let mut subscribers = self.registry.lock();
        subscribers.retain(|_, sender| sender.send(Arc::clone(snapshot)).is_ok());
        subscribers.len()
    }

    /// Releases a listener by id. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().len()
    }
}

/// Receiving side of one listener registration.
///
/// Dropping the subscription releases it from the hub.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: UnboundedReceiver<Snapshot>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next snapshot. `None` once released and drained.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    /// Blocking variant of [`Subscription::recv`] for worker threads.
    ///
    /// # Panics
    /// - When called from within an asynchronous execution context.
    pub fn blocking_recv(&mut self) -> Option<Snapshot> {
        self.receiver.blocking_recv()
    }

    /// Returns a buffered snapshot without waiting.
    pub fn try_recv(&mut self) -> Option<Snapshot> {
        self.receiver.try_recv().ok()
    }

    /// Returns a handle that can release this subscription from elsewhere.
    pub fn closer(&self) -> SubscriptionCloser {
        SubscriptionCloser {
            id: self.id,
            registry: Weak::clone(&self.registry),
        }
    }

    /// Explicitly releases this subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

/// Detached release handle for a [`Subscription`].
#[derive(Debug, Clone)]
pub struct SubscriptionCloser {
    id: SubscriptionId,
    registry: Weak<Registry>,
}

impl SubscriptionCloser {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Releases the subscription. Returns `false` if it was already gone.
    pub fn close(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }
}
