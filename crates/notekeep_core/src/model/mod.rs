//! Domain model for persisted notes.
//!
//! # Responsibility
//! - Define the canonical `Note` record and the `Snapshot` view type.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId`.
//! - Snapshots are immutable once built; consumers copy on read.

pub mod note;
