//! Synchronization between the remote store and the local mirror.
//!
//! `SyncManager` is the single entry point application code talks to. It
//! routes reads through the mirror with remote fallback and pushes every
//! mutation through the remote store before committing it locally.

pub mod manager;

pub use manager::SyncManager;
