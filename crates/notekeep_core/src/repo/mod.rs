//! Repository layer between the note store and its consumers.
//!
//! # Responsibility
//! - Offer add/update/delete verbs without exposing store internals.
//! - Forward the live collection with consecutive duplicates removed.
//!
//! # Invariants
//! - Store errors pass through untranslated.

pub mod note_repository;
