//! Local mirror of the remote document.
//!
//! The `Mirror` holds one entity's document in memory and enforces the
//! per-partition uniqueness and existence invariants. It is exclusively
//! owned and mutated by the sync manager; the remote store stays the
//! source of truth.

pub mod mirror;

pub use mirror::{Mirror, MirrorError};
