//! Note domain model.
//!
//! # Responsibility
//! - Define the single persisted entity and its construction helpers.
//!
//! # Invariants
//! - `id` is assigned once at construction and never reused.
//! - `entry_date` is the creation instant and is carried across revisions.
//! - Equality is field-wise over all four fields.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier of a note; primary key in storage.
pub type NoteId = Uuid;

/// Immutable, ordered view of every stored note at one point in time.
pub type Snapshot = Arc<[Note]>;

/// A short text note.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub description: String,
    /// Creation time in Unix epoch milliseconds.
    pub entry_date: i64,
}

impl Note {
    /// Creates a note with a fresh id, stamped with the current time.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title, description, now_epoch_ms())
    }

    /// Creates a note with caller-provided identity and creation time.
    ///
    /// Used by import paths and tests where identity already exists.
    pub fn with_id(
        id: NoteId,
        title: impl Into<String>,
        description: impl Into<String>,
        entry_date: i64,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            entry_date,
        }
    }

    /// Returns a copy with replaced text, keeping `id` and `entry_date`.
    pub fn revised(&self, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_id(self.id, title, description, self.entry_date)
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
///
/// Clocks set before 1970 collapse to `0`.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}

/// Builds a snapshot from owned notes.
pub fn snapshot_of(notes: Vec<Note>) -> Snapshot {
    Arc::from(notes)
}

/// A small fixed set of fresh notes for seeding demo and smoke runs.
pub fn sample_notes() -> Vec<Note> {
    [
        ("Groceries", "Milk, eggs, rye bread"),
        ("Call mom", "Sunday after lunch"),
        ("Dentist", "Thursday 9:30, bring insurance card"),
        ("Book club", "Finish chapters 4 to 6"),
        ("Bike", "Pump tyres and oil the chain"),
    ]
    .into_iter()
    .map(|(title, description)| Note::new(title, description))
    .collect()
}
