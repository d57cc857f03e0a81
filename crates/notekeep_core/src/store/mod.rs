//! Durable note storage.
//!
//! # Responsibility
//! - Define the CRUD + live-snapshot contract over the note table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - The store is the single owner of durable note state.
//! - Every committed row change is followed by one full-snapshot publication.
//! - Point lookups report `NotFound`; deletes and list queries never do.

pub mod note_store;
