//! Change propagation from the store to live observers.
//!
//! # Responsibility
//! - Fan out full-collection snapshots to every registered listener.
//! - Make listener registration and release explicit.
//!
//! # Invariants
//! - Each listener receives snapshots in publication order.
//! - Publishing never blocks on a slow listener.

pub mod hub;
