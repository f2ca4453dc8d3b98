//! Codec between `Record` and the remote store's native string encoding.
//!
//! Each record travels as a single space-separated string:
//! `"<ISO-8601 UTC timestamp> <v1> <v2> ... <vn>"`. The timestamp is
//! rendered at whole-second precision, so sub-second components are
//! truncated on encode. That precision loss is a property of the wire
//! format, not something the codec repairs.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::models::{DocumentData, Record};

/// A record string that could not be decoded. Batch helpers fail the whole
/// batch on the first bad entry rather than collecting per-item errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedRecord {
    #[error("empty record string")]
    Empty,

    #[error("invalid timestamp token: {0}")]
    BadTimestamp(String),

    #[error("invalid value token: {0}")]
    BadValue(String),
}

/// Encode one record as `"<timestamp> <v1> ... <vn>"`, no trailing space.
pub fn encode_record(record: &Record) -> String {
    let mut out = record
        .timestamp
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    for value in &record.values {
        out.push(' ');
        out.push_str(&value.to_string());
    }
    out
}

/// Decode one record string produced by [`encode_record`].
pub fn decode_record(input: &str) -> Result<Record, MalformedRecord> {
    let mut tokens = input.split_whitespace();

    let first = tokens.next().ok_or(MalformedRecord::Empty)?;
    let timestamp = DateTime::parse_from_rfc3339(first)
        .map_err(|_| MalformedRecord::BadTimestamp(first.to_string()))?
        .with_timezone(&Utc);

    let mut values = Vec::new();
    for token in tokens {
        let value: f64 = token
            .parse()
            .map_err(|_| MalformedRecord::BadValue(token.to_string()))?;
        values.push(value);
    }

    Ok(Record::new(timestamp, values))
}

/// Encode a whole partition, preserving record order.
pub fn encode_partition(records: &[Record]) -> Vec<String> {
    records.iter().map(encode_record).collect()
}

/// Decode a whole partition. One bad entry fails the batch.
pub fn decode_partition(strings: &[String]) -> Result<Vec<Record>, MalformedRecord> {
    strings.iter().map(|s| decode_record(s)).collect()
}

/// Encode a whole document into the remote store's field representation.
pub fn encode_document(document: &DocumentData) -> HashMap<String, Vec<String>> {
    document
        .iter()
        .map(|(name, records)| (name.clone(), encode_partition(records)))
        .collect()
}

/// Decode a whole document. One bad entry in any partition fails the batch.
pub fn decode_document(
    fields: &HashMap<String, Vec<String>>,
) -> Result<DocumentData, MalformedRecord> {
    let mut document = DocumentData::new();
    for (name, strings) in fields {
        document.insert(name.clone(), decode_partition(strings)?);
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 16, 8, 30, secs).unwrap()
    }

    #[test]
    fn test_encode_record_format() {
        let record = Record::new(ts(0), vec![1.0, 2.5, 3.0]);
        assert_eq!(encode_record(&record), "2025-07-16T08:30:00Z 1 2.5 3");
    }

    #[test]
    fn test_encode_record_no_values() {
        let record = Record::new(ts(5), vec![]);
        assert_eq!(encode_record(&record), "2025-07-16T08:30:05Z");
    }

    #[test]
    fn test_round_trip() {
        let record = Record::new(ts(42), vec![0.0, -12.75, 1e6, 3.14159]);
        let decoded = decode_record(&encode_record(&record)).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_decode_empty_string() {
        assert_eq!(decode_record(""), Err(MalformedRecord::Empty));
        assert_eq!(decode_record("   "), Err(MalformedRecord::Empty));
    }

    #[test]
    fn test_decode_bad_timestamp() {
        assert_eq!(
            decode_record("yesterday 1 2"),
            Err(MalformedRecord::BadTimestamp("yesterday".to_string()))
        );
    }

    #[test]
    fn test_decode_bad_value() {
        assert_eq!(
            decode_record("2025-07-16T08:30:00Z 1 two"),
            Err(MalformedRecord::BadValue("two".to_string()))
        );
    }

    #[test]
    fn test_decode_partition_fails_whole_batch() {
        let strings = vec![
            "2025-07-16T08:30:00Z 1".to_string(),
            "not-a-record".to_string(),
            "2025-07-16T08:31:00Z 2".to_string(),
        ];
        assert!(decode_partition(&strings).is_err());
    }

    #[test]
    fn test_document_round_trip() {
        let mut document = DocumentData::new();
        document.insert("steps".to_string(), vec![Record::new(ts(0), vec![1.0, 2.0])]);
        document.insert("distance".to_string(), vec![]);

        let encoded = encode_document(&document);
        assert_eq!(decode_document(&encoded).unwrap(), document);
    }

    #[test]
    fn test_decode_document_fails_on_any_bad_partition() {
        let mut fields = HashMap::new();
        fields.insert("steps".to_string(), vec!["2025-07-16T08:30:00Z 1".to_string()]);
        fields.insert("distance".to_string(), vec!["bogus".to_string()]);
        assert!(decode_document(&fields).is_err());
    }
}
