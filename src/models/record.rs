use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped measurement: an instant plus an ordered sequence of values.
///
/// Records are immutable once constructed and replaced wholesale on update.
/// Within a partition a record is identified by its timestamp alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub values: Vec<f64>,
}

impl Record {
    pub fn new(timestamp: DateTime<Utc>, values: Vec<f64>) -> Self {
        Self { timestamp, values }
    }
}

/// The full set of partitions owned by one entity id: partition name mapped
/// to an ordered record sequence. Partition names are case-sensitive and
/// unique by construction.
pub type DocumentData = HashMap<String, Vec<Record>>;
