//! Remote store access: the authoritative persistence boundary.
//!
//! `RemoteStore` is the seam the sync manager writes through; the concrete
//! implementation is `FirestoreClient`, which speaks the Firestore REST v1
//! API. Every method suspends for network I/O and may fail; failures are
//! normalized into `RemoteError` rather than leaking transport codes.

pub mod client;
pub mod error;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{DocumentData, Record};

pub use client::FirestoreClient;
pub use error::RemoteError;

/// Authoritative store for one entity's document.
///
/// Result conventions: `Err` means the operation could not be carried out
/// (network, permission, backend); `Ok(false)` means the store carried it
/// out far enough to refuse it (duplicate timestamp, missing source, name
/// collision). Callers that only need a success signal collapse both into
/// "failed".
#[async_trait]
pub trait RemoteStore {
    /// Fetch the whole document. `Ok(None)` means nothing usable: either
    /// the document does not exist or its payload failed to decode. The
    /// two cases are deliberately not distinguished here.
    async fn fetch_document(&self) -> Result<Option<DocumentData>, RemoteError>;

    /// Fetch one partition, built on [`RemoteStore::fetch_document`].
    async fn fetch_partition(&self, name: &str) -> Result<Option<Vec<Record>>, RemoteError>;

    /// Append a record unless one with the same timestamp already exists.
    /// Fetch-modify-write; concurrent callers on the same partition can
    /// race and lose an update. Known consistency gap.
    async fn append_record(&self, partition: &str, record: &Record)
        -> Result<bool, RemoteError>;

    /// Replace the record matching `record.timestamp`; a missing match is
    /// a successful no-op, mirroring the local cache semantics.
    async fn replace_record(&self, partition: &str, record: &Record)
        -> Result<bool, RemoteError>;

    /// Remove records matching the timestamp. Removing a timestamp that is
    /// not present is treated as success (idempotent delete).
    async fn remove_record(
        &self,
        partition: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<bool, RemoteError>;

    /// Write an empty partition. With `check_existence`, refuse when the
    /// name is already taken.
    async fn create_partition(&self, name: &str, check_existence: bool)
        -> Result<bool, RemoteError>;

    /// Create the owning document. With `check_existence`, refuse when it
    /// already exists.
    async fn create_document(&self, check_existence: bool) -> Result<bool, RemoteError>;

    /// Delete a partition and its contents.
    async fn delete_partition(&self, name: &str) -> Result<bool, RemoteError>;

    /// Move a partition's contents to a new name. Three round trips (read,
    /// write, delete), not atomic: a mid-sequence failure can leave both
    /// names present or the target incomplete. Known gap, documented.
    async fn rename_partition(&self, from: &str, to: &str) -> Result<bool, RemoteError>;

    /// Whether the partition exists. `Err` means unknown (the fetch itself
    /// failed), which is distinct from `Ok(false)`.
    async fn partition_exists(&self, name: &str) -> Result<bool, RemoteError>;
}
