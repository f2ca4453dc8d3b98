//! Write-through synchronization between the remote store and the mirror.
//!
//! Reads are served from the mirror, falling back to the remote store on a
//! miss. Every mutation goes to the remote store first and touches the
//! mirror only after the remote reports success, so the remote is never
//! behind the mirror. If the mirror update itself fails after a successful
//! remote write, the mismatch is logged and the mirror is left to drift
//! until the next full fetch; the remote stays the source of truth.
//!
//! A manager instance expects a single logical owner. There is no internal
//! locking; `&mut self` on every operation makes exclusive access a
//! compile-time property. Concurrent managers pointed at the same entity id
//! can interleave remote read-modify-write sequences and lose updates.
//! That is an accepted limitation.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cache::Mirror;
use crate::models::{DocumentData, Record};
use crate::remote::RemoteStore;

pub struct SyncManager<R: RemoteStore> {
    remote: R,
    mirror: Mirror,
}

impl<R: RemoteStore> SyncManager<R> {
    /// Build a ready manager: fetch the whole document, seed the mirror
    /// with its contents (or leave it empty when nothing usable comes
    /// back), then make sure the owning document exists remotely.
    pub async fn create(remote: R) -> Self {
        let mirror = match remote.fetch_document().await {
            Ok(Some(document)) => Mirror::new(document),
            Ok(None) => {
                debug!("no remote document yet, starting with an empty mirror");
                Mirror::default()
            }
            Err(e) => {
                warn!(error = %e, "initial document fetch failed, starting with an empty mirror");
                Mirror::default()
            }
        };

        match remote.create_document(true).await {
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to ensure remote document exists"),
        }

        Self { remote, mirror }
    }

    // ===== Read path =====

    /// The whole document. Once any fetch has populated the mirror it is
    /// served directly; otherwise one remote fetch is attempted and `None`
    /// is returned if it yields nothing usable.
    pub async fn get_all(&mut self) -> Option<DocumentData> {
        if !self.populate_if_empty().await {
            return None;
        }
        Some(self.mirror.snapshot())
    }

    /// One partition's contents. A mirror miss falls back to fetching just
    /// that partition and installing it; a miss on both sides is `None`,
    /// since lookup misses are expected, not exceptional.
    pub async fn get_partition(&mut self, name: &str) -> Option<Vec<Record>> {
        if !self.populate_if_empty().await {
            return None;
        }

        if let Ok(records) = self.mirror.get_all(name) {
            return Some(records.to_vec());
        }

        debug!(partition = name, "not in mirror, fetching from remote");
        match self.remote.fetch_partition(name).await {
            Ok(Some(records)) => {
                self.mirror.install(name, records.clone());
                Some(records)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(partition = name, error = %e, "remote partition fetch failed");
                None
            }
        }
    }

    /// One record by exact timestamp, via [`SyncManager::get_partition`].
    pub async fn get(&mut self, name: &str, timestamp: DateTime<Utc>) -> Option<Record> {
        let records = self.get_partition(name).await?;
        records.into_iter().find(|r| r.timestamp == timestamp)
    }

    // ===== Write path: remote first, mirror second =====

    /// Append a record. Fails when a record with the same timestamp already
    /// exists or the remote write cannot be carried out.
    pub async fn add(&mut self, name: &str, record: Record) -> bool {
        match self.remote.append_record(name, &record).await {
            Ok(true) => {
                if let Err(e) = self.mirror.add(name, record) {
                    warn!(
                        partition = name,
                        error = %e,
                        "record accepted remotely but mirror update failed; mirror is stale until the next full fetch"
                    );
                }
                true
            }
            Ok(false) => {
                warn!(partition = name, "remote store rejected append");
                false
            }
            Err(e) => {
                warn!(partition = name, error = %e, "failed to append record remotely");
                false
            }
        }
    }

    /// Replace the record matching `record.timestamp`. A missing match is a
    /// silent no-op on both sides.
    pub async fn update(&mut self, name: &str, record: Record) -> bool {
        match self.remote.replace_record(name, &record).await {
            Ok(true) => {
                if let Err(e) = self.mirror.update(name, record) {
                    warn!(
                        partition = name,
                        error = %e,
                        "record replaced remotely but mirror update failed; mirror is stale until the next full fetch"
                    );
                }
                true
            }
            Ok(false) => {
                warn!(partition = name, "remote store rejected update");
                false
            }
            Err(e) => {
                warn!(partition = name, error = %e, "failed to update record remotely");
                false
            }
        }
    }

    /// Remove the record with the exact timestamp.
    pub async fn remove(&mut self, name: &str, timestamp: DateTime<Utc>) -> bool {
        match self.remote.remove_record(name, timestamp).await {
            Ok(true) => {
                if let Err(e) = self.mirror.remove(name, timestamp) {
                    warn!(
                        partition = name,
                        error = %e,
                        "record removed remotely but mirror update failed; mirror is stale until the next full fetch"
                    );
                }
                true
            }
            Ok(false) => {
                warn!(partition = name, "remote store rejected removal");
                false
            }
            Err(e) => {
                warn!(partition = name, error = %e, "failed to remove record remotely");
                false
            }
        }
    }

    /// Create an empty partition, existence-checked remotely.
    pub async fn create_partition(&mut self, name: &str) -> bool {
        match self.remote.create_partition(name, true).await {
            Ok(true) => {
                if let Err(e) = self.mirror.create_partition(name) {
                    warn!(
                        partition = name,
                        error = %e,
                        "partition created remotely but mirror update failed; mirror is stale until the next full fetch"
                    );
                }
                true
            }
            Ok(false) => {
                warn!(partition = name, "remote store rejected partition creation");
                false
            }
            Err(e) => {
                warn!(partition = name, error = %e, "failed to create partition remotely");
                false
            }
        }
    }

    /// Delete a partition and its contents. Idempotent on the mirror side.
    pub async fn remove_partition(&mut self, name: &str) -> bool {
        match self.remote.delete_partition(name).await {
            Ok(true) => {
                self.mirror.delete_partition(name);
                true
            }
            Ok(false) => {
                warn!(partition = name, "remote store rejected partition removal");
                false
            }
            Err(e) => {
                warn!(partition = name, error = %e, "failed to delete partition remotely");
                false
            }
        }
    }

    /// Rename a partition.
    ///
    /// Unlike the other mutations this pre-checks the mirror (`from`
    /// present, `to` absent) and short-circuits without any remote call
    /// when those checks fail.
    pub async fn rename_partition(&mut self, from: &str, to: &str) -> bool {
        if !self.mirror.contains(from) {
            warn!(partition = from, "rename refused: source not present in mirror");
            return false;
        }
        if self.mirror.contains(to) {
            warn!(partition = to, "rename refused: target already present in mirror");
            return false;
        }

        match self.remote.rename_partition(from, to).await {
            Ok(true) => {
                if let Err(e) = self.mirror.rename_partition(from, to) {
                    warn!(
                        from,
                        to,
                        error = %e,
                        "partition renamed remotely but mirror update failed; mirror is stale until the next full fetch"
                    );
                }
                true
            }
            Ok(false) => {
                warn!(from, to, "remote store rejected partition rename");
                false
            }
            Err(e) => {
                warn!(from, to, error = %e, "failed to rename partition remotely");
                false
            }
        }
    }

    /// Fill an empty mirror from a full remote fetch. Returns whether the
    /// mirror is usable for reads afterwards.
    async fn populate_if_empty(&mut self) -> bool {
        if !self.mirror.is_empty() {
            return true;
        }

        debug!("mirror is empty, fetching full document from remote");
        match self.remote.fetch_document().await {
            Ok(Some(document)) => {
                self.mirror.replace_document(document);
                true
            }
            Ok(None) => {
                warn!("full fetch returned nothing usable");
                false
            }
            Err(e) => {
                warn!(error = %e, "full fetch failed");
                false
            }
        }
    }
}
