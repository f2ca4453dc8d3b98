//! In-memory mirror of one entity's remote document.
//!
//! The mirror is a derived, disposable view: it is created empty, replaced
//! wholesale after a full remote fetch, and mutated incrementally after
//! successful remote writes. Dropping it loses nothing authoritative.
//! All operations are synchronous and perform no I/O.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{DocumentData, Record};

/// Invariant violations raised by mirror operations. All are locally
/// recoverable; the sync manager decides the fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MirrorError {
    #[error("partition not found: {0}")]
    PartitionNotFound(String),

    #[error("no record at timestamp {0}")]
    RecordNotFound(DateTime<Utc>),

    #[error("record with timestamp {0} already exists")]
    DuplicateTimestamp(DateTime<Utc>),

    #[error("partition already exists: {0}")]
    PartitionAlreadyExists(String),
}

#[derive(Debug, Default)]
pub struct Mirror {
    partitions: DocumentData,
}

impl Mirror {
    pub fn new(partitions: DocumentData) -> Self {
        Self { partitions }
    }

    /// True until the mirror has been populated with at least one partition.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn contains(&self, partition: &str) -> bool {
        self.partitions.contains_key(partition)
    }

    /// Clone of the full document, for whole-document reads.
    pub fn snapshot(&self) -> DocumentData {
        self.partitions.clone()
    }

    /// Swap in a freshly fetched document wholesale.
    pub fn replace_document(&mut self, document: DocumentData) {
        self.partitions = document;
    }

    /// Install a fetched partition unconditionally, creating or replacing it.
    /// Used when a single-partition remote fetch fills a cache miss.
    pub fn install(&mut self, partition: &str, records: Vec<Record>) {
        self.partitions.insert(partition.to_string(), records);
    }

    /// Get the record with the exact timestamp.
    pub fn get(&self, partition: &str, timestamp: DateTime<Utc>) -> Result<&Record, MirrorError> {
        let records = self.records(partition)?;
        records
            .iter()
            .find(|r| r.timestamp == timestamp)
            .ok_or(MirrorError::RecordNotFound(timestamp))
    }

    /// Get the full contents of a partition (possibly empty).
    pub fn get_all(&self, partition: &str) -> Result<&[Record], MirrorError> {
        Ok(self.records(partition)?)
    }

    /// Replace the record whose timestamp matches `record.timestamp`.
    ///
    /// Silently does nothing when no record matches: absence at the
    /// partition level is an error, absence at the record level is not.
    pub fn update(&mut self, partition: &str, record: Record) -> Result<(), MirrorError> {
        let records = self.records_mut(partition)?;
        if let Some(slot) = records.iter_mut().find(|r| r.timestamp == record.timestamp) {
            *slot = record;
        }
        Ok(())
    }

    /// Apply [`Mirror::update`] for each input record, returning the records
    /// whose timestamps had no match instead of erroring on them.
    pub fn update_many(
        &mut self,
        partition: &str,
        records: Vec<Record>,
    ) -> Result<Vec<Record>, MirrorError> {
        let existing = self.records_mut(partition)?;
        let mut skipped = Vec::new();
        for record in records {
            match existing.iter_mut().find(|r| r.timestamp == record.timestamp) {
                Some(slot) => *slot = record,
                None => skipped.push(record),
            }
        }
        Ok(skipped)
    }

    /// Append a record, rejecting duplicates by timestamp.
    pub fn add(&mut self, partition: &str, record: Record) -> Result<(), MirrorError> {
        let records = self.records_mut(partition)?;
        if records.iter().any(|r| r.timestamp == record.timestamp) {
            return Err(MirrorError::DuplicateTimestamp(record.timestamp));
        }
        records.push(record);
        Ok(())
    }

    /// Remove the first record with the exact timestamp.
    pub fn remove(&mut self, partition: &str, timestamp: DateTime<Utc>) -> Result<(), MirrorError> {
        let records = self.records_mut(partition)?;
        match records.iter().position(|r| r.timestamp == timestamp) {
            Some(index) => {
                records.remove(index);
                Ok(())
            }
            None => Err(MirrorError::RecordNotFound(timestamp)),
        }
    }

    /// Replace the entire partition contents unconditionally. Uniqueness is
    /// not re-checked; that is the caller's responsibility.
    pub fn overwrite_all(
        &mut self,
        partition: &str,
        records: Vec<Record>,
    ) -> Result<(), MirrorError> {
        let slot = self.records_mut(partition)?;
        *slot = records;
        Ok(())
    }

    pub fn create_partition(&mut self, name: &str) -> Result<(), MirrorError> {
        if self.partitions.contains_key(name) {
            return Err(MirrorError::PartitionAlreadyExists(name.to_string()));
        }
        self.partitions.insert(name.to_string(), Vec::new());
        Ok(())
    }

    /// Idempotent removal; a missing partition is not an error.
    pub fn delete_partition(&mut self, name: &str) {
        self.partitions.remove(name);
    }

    /// Atomically move a partition's contents to a new name.
    pub fn rename_partition(&mut self, from: &str, to: &str) -> Result<(), MirrorError> {
        if !self.partitions.contains_key(from) {
            return Err(MirrorError::PartitionNotFound(from.to_string()));
        }
        if self.partitions.contains_key(to) {
            return Err(MirrorError::PartitionAlreadyExists(to.to_string()));
        }
        let records = self.partitions.remove(from).unwrap_or_default();
        self.partitions.insert(to.to_string(), records);
        Ok(())
    }

    fn records(&self, partition: &str) -> Result<&Vec<Record>, MirrorError> {
        self.partitions
            .get(partition)
            .ok_or_else(|| MirrorError::PartitionNotFound(partition.to_string()))
    }

    fn records_mut(&mut self, partition: &str) -> Result<&mut Vec<Record>, MirrorError> {
        self.partitions
            .get_mut(partition)
            .ok_or_else(|| MirrorError::PartitionNotFound(partition.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 16, 12, 0, secs).unwrap()
    }

    fn mirror_with_steps() -> Mirror {
        let mut mirror = Mirror::default();
        mirror.create_partition("steps").unwrap();
        mirror
            .add("steps", Record::new(ts(1), vec![1.0, 2.0, 3.0]))
            .unwrap();
        mirror
    }

    #[test]
    fn test_get_missing_partition() {
        let mirror = Mirror::default();
        assert_eq!(
            mirror.get("steps", ts(1)),
            Err(MirrorError::PartitionNotFound("steps".to_string()))
        );
    }

    #[test]
    fn test_get_missing_record() {
        let mirror = mirror_with_steps();
        assert_eq!(
            mirror.get("steps", ts(9)),
            Err(MirrorError::RecordNotFound(ts(9)))
        );
    }

    #[test]
    fn test_get_all_includes_empty_partition() {
        let mut mirror = Mirror::default();
        mirror.create_partition("distance").unwrap();
        assert!(mirror.get_all("distance").unwrap().is_empty());
    }

    #[test]
    fn test_add_rejects_duplicate_timestamp_and_leaves_partition_unchanged() {
        let mut mirror = mirror_with_steps();
        let result = mirror.add("steps", Record::new(ts(1), vec![9.0]));
        assert_eq!(result, Err(MirrorError::DuplicateTimestamp(ts(1))));
        assert_eq!(
            mirror.get_all("steps").unwrap(),
            &[Record::new(ts(1), vec![1.0, 2.0, 3.0])]
        );
    }

    #[test]
    fn test_update_missing_record_is_silent_noop() {
        let mut mirror = mirror_with_steps();
        mirror
            .update("steps", Record::new(ts(2), vec![5.0]))
            .unwrap();
        assert_eq!(
            mirror.get_all("steps").unwrap(),
            &[Record::new(ts(1), vec![1.0, 2.0, 3.0])]
        );
    }

    #[test]
    fn test_update_replaces_matching_record() {
        let mut mirror = mirror_with_steps();
        mirror
            .update("steps", Record::new(ts(1), vec![7.0]))
            .unwrap();
        assert_eq!(
            mirror.get("steps", ts(1)).unwrap(),
            &Record::new(ts(1), vec![7.0])
        );
    }

    #[test]
    fn test_update_many_returns_skipped_records() {
        let mut mirror = mirror_with_steps();
        mirror.add("steps", Record::new(ts(2), vec![2.0])).unwrap();

        let skipped = mirror
            .update_many(
                "steps",
                vec![
                    Record::new(ts(1), vec![10.0]),
                    Record::new(ts(5), vec![50.0]),
                    Record::new(ts(2), vec![20.0]),
                ],
            )
            .unwrap();

        assert_eq!(skipped, vec![Record::new(ts(5), vec![50.0])]);
        assert_eq!(mirror.get("steps", ts(1)).unwrap().values, vec![10.0]);
        assert_eq!(mirror.get("steps", ts(2)).unwrap().values, vec![20.0]);
    }

    #[test]
    fn test_remove_then_get_fails() {
        let mut mirror = mirror_with_steps();
        mirror.remove("steps", ts(1)).unwrap();
        assert_eq!(
            mirror.get("steps", ts(1)),
            Err(MirrorError::RecordNotFound(ts(1)))
        );
    }

    #[test]
    fn test_remove_missing_record() {
        let mut mirror = mirror_with_steps();
        assert_eq!(
            mirror.remove("steps", ts(9)),
            Err(MirrorError::RecordNotFound(ts(9)))
        );
    }

    #[test]
    fn test_overwrite_all_skips_uniqueness_check() {
        let mut mirror = mirror_with_steps();
        let duplicated = vec![
            Record::new(ts(3), vec![1.0]),
            Record::new(ts(3), vec![2.0]),
        ];
        mirror.overwrite_all("steps", duplicated.clone()).unwrap();
        assert_eq!(mirror.get_all("steps").unwrap(), duplicated.as_slice());
    }

    #[test]
    fn test_overwrite_all_requires_partition() {
        let mut mirror = Mirror::default();
        assert_eq!(
            mirror.overwrite_all("steps", vec![]),
            Err(MirrorError::PartitionNotFound("steps".to_string()))
        );
    }

    #[test]
    fn test_create_partition_rejects_existing_name() {
        let mut mirror = mirror_with_steps();
        assert_eq!(
            mirror.create_partition("steps"),
            Err(MirrorError::PartitionAlreadyExists("steps".to_string()))
        );
    }

    #[test]
    fn test_delete_partition_is_idempotent() {
        let mut mirror = mirror_with_steps();
        mirror.delete_partition("steps");
        mirror.delete_partition("steps");
        assert!(!mirror.contains("steps"));
    }

    #[test]
    fn test_rename_partition_moves_contents() {
        let mut mirror = mirror_with_steps();
        mirror.rename_partition("steps", "distance").unwrap();
        assert!(!mirror.contains("steps"));
        assert_eq!(
            mirror.get_all("distance").unwrap(),
            &[Record::new(ts(1), vec![1.0, 2.0, 3.0])]
        );
    }

    #[test]
    fn test_rename_partition_rejects_existing_target() {
        let mut mirror = mirror_with_steps();
        mirror.create_partition("distance").unwrap();
        assert_eq!(
            mirror.rename_partition("steps", "distance"),
            Err(MirrorError::PartitionAlreadyExists("distance".to_string()))
        );
        // Source is untouched on failure.
        assert!(mirror.contains("steps"));
    }

    #[test]
    fn test_rename_partition_missing_source() {
        let mut mirror = Mirror::default();
        assert_eq!(
            mirror.rename_partition("steps", "distance"),
            Err(MirrorError::PartitionNotFound("steps".to_string()))
        );
    }
}
