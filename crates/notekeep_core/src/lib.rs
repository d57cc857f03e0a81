//! Core persistence and change propagation for notekeep.
//! This crate is the single source of truth for note storage invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;
pub mod sync;

pub use config::{ConfigError, CoreConfig};
pub use db::{DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{now_epoch_ms, sample_notes, snapshot_of, Note, NoteId, Snapshot};
pub use repo::note_repository::{NoteRepository, NoteStream};
pub use service::note_feed::{EmptySnapshotPolicy, FeedHandle, NoteFeed, ParsePolicyError};
pub use store::note_store::{NoteStore, SqliteNoteStore, StoreError, StoreResult};
pub use sync::hub::{SnapshotHub, Subscription, SubscriptionCloser, SubscriptionId};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
