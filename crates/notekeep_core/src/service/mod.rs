//! Consumer-side services built on the repository.
//!
//! # Responsibility
//! - Keep presentation layers decoupled from storage and stream plumbing.

pub mod note_feed;
