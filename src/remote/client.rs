//! Firestore REST client for one entity's document.
//!
//! The whole document lives at `{collection}/{entity_id}`; each field maps
//! a partition name to an array of strings encoded by the codec. Writes
//! use `updateMask` field paths so a write to one partition never clobbers
//! its siblings (merge semantics).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codec;
use crate::config::Config;
use crate::models::{DocumentData, Record};

use super::{RemoteError, RemoteStore};

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the Firestore REST v1 API
const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// HTTP request timeout in seconds.
/// 30s allows for slow responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) reads.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

// ============================================================================
// Wire types (Firestore REST JSON)
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: HashMap<String, FirestoreValue>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FirestoreValue {
    #[serde(rename = "arrayValue")]
    array_value: FirestoreArray,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FirestoreArray {
    // Firestore omits `values` entirely for an empty array.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<FirestoreString>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FirestoreString {
    #[serde(rename = "stringValue")]
    string_value: String,
}

impl FirestoreDocument {
    fn from_string_fields(fields: HashMap<String, Vec<String>>) -> Self {
        let fields = fields
            .into_iter()
            .map(|(name, strings)| {
                let values = strings
                    .into_iter()
                    .map(|s| FirestoreString { string_value: s })
                    .collect();
                (
                    name,
                    FirestoreValue {
                        array_value: FirestoreArray { values },
                    },
                )
            })
            .collect();
        Self { fields }
    }

    fn into_string_fields(self) -> HashMap<String, Vec<String>> {
        self.fields
            .into_iter()
            .map(|(name, value)| {
                let strings = value
                    .array_value
                    .values
                    .into_iter()
                    .map(|v| v.string_value)
                    .collect();
                (name, strings)
            })
            .collect()
    }
}

// ============================================================================
// Client
// ============================================================================

/// Remote store client for one entity id.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct FirestoreClient {
    client: Client,
    base_url: String,
    project_id: String,
    collection: String,
    entity_id: String,
    token: Option<String>,
}

impl FirestoreClient {
    /// Create a client bound to one entity's document.
    pub fn new(config: &Config, entity_id: &str) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| FIRESTORE_BASE_URL.to_string()),
            project_id: config.project_id.clone(),
            collection: config.collection.clone(),
            entity_id: entity_id.to_string(),
            token: None,
        })
    }

    /// Create a new client carrying a bearer token (Firebase Auth ID
    /// token), sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            token: Some(token),
            ..self.clone()
        }
    }

    fn documents_root_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url, self.project_id
        )
    }

    fn document_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.documents_root_url(),
            self.collection,
            self.entity_id
        )
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, RemoteError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| RemoteError::InvalidResponse(format!("bad token header: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning a normalized error if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(RemoteError::from_status(status, &body))
        }
    }

    /// GET the raw document. A 404 is reported as `Ok(None)`, not an error.
    /// Rate-limited reads retry with exponential backoff.
    async fn get_document_raw(&self) -> Result<Option<FirestoreDocument>, RemoteError> {
        let url = self.document_url();
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .get(&url)
                .headers(self.auth_headers()?)
                .send()
                .await?;

            match response.status() {
                StatusCode::NOT_FOUND => return Ok(None),
                StatusCode::TOO_MANY_REQUESTS => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(RemoteError::RateLimited);
                    }
                    warn!(url = %url, retry = retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
                _ => {
                    let response = Self::check_response(response).await?;
                    let document: FirestoreDocument = response.json().await?;
                    return Ok(Some(document));
                }
            }
        }
    }

    /// PATCH the listed fields with merge semantics: only field paths named
    /// in the update mask are touched. A field in the mask but absent from
    /// the body is deleted.
    async fn patch_fields(
        &self,
        mask: &[&str],
        fields: HashMap<String, Vec<String>>,
    ) -> Result<(), RemoteError> {
        let url = self.document_url();
        let query: Vec<(&str, &str)> = mask
            .iter()
            .map(|name| ("updateMask.fieldPaths", *name))
            .collect();
        let body = FirestoreDocument::from_string_fields(fields);

        let response = self
            .client
            .patch(&url)
            .headers(self.auth_headers()?)
            .query(&query)
            .json(&body)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    /// Write one partition's full encoded contents back under its field.
    async fn write_partition(&self, partition: &str, records: &[Record]) -> Result<(), RemoteError> {
        let mut fields = HashMap::new();
        fields.insert(partition.to_string(), codec::encode_partition(records));
        self.patch_fields(&[partition], fields).await
    }
}

#[async_trait]
impl RemoteStore for FirestoreClient {
    async fn fetch_document(&self) -> Result<Option<DocumentData>, RemoteError> {
        let Some(document) = self.get_document_raw().await? else {
            debug!(entity = %self.entity_id, "document not found remotely");
            return Ok(None);
        };

        let fields = document.into_string_fields();
        match codec::decode_document(&fields) {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                // An undecodable payload is reported exactly like a missing
                // document. Callers cannot tell the two apart.
                warn!(entity = %self.entity_id, error = %e, "failed to decode document payload");
                Ok(None)
            }
        }
    }

    async fn fetch_partition(&self, name: &str) -> Result<Option<Vec<Record>>, RemoteError> {
        let Some(mut document) = self.fetch_document().await? else {
            return Ok(None);
        };
        Ok(document.remove(name))
    }

    async fn append_record(
        &self,
        partition: &str,
        record: &Record,
    ) -> Result<bool, RemoteError> {
        // Fetch-modify-write; concurrent appends to the same partition race.
        let Some(mut records) = self.fetch_partition(partition).await? else {
            warn!(partition, "append rejected: partition not found remotely");
            return Ok(false);
        };

        if records.iter().any(|r| r.timestamp == record.timestamp) {
            warn!(
                partition,
                timestamp = %record.timestamp,
                "append rejected: record with this timestamp already exists"
            );
            return Ok(false);
        }

        records.push(record.clone());
        self.write_partition(partition, &records).await?;
        Ok(true)
    }

    async fn replace_record(
        &self,
        partition: &str,
        record: &Record,
    ) -> Result<bool, RemoteError> {
        let Some(mut records) = self.fetch_partition(partition).await? else {
            warn!(partition, "replace rejected: partition not found remotely");
            return Ok(false);
        };

        // A missing match is a successful no-op, same as the local mirror.
        if let Some(slot) = records.iter_mut().find(|r| r.timestamp == record.timestamp) {
            *slot = record.clone();
        }

        self.write_partition(partition, &records).await?;
        Ok(true)
    }

    async fn remove_record(
        &self,
        partition: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<bool, RemoteError> {
        let Some(mut records) = self.fetch_partition(partition).await? else {
            warn!(partition, "remove rejected: partition not found remotely");
            return Ok(false);
        };

        // Removing a timestamp that is not present still succeeds.
        records.retain(|r| r.timestamp != timestamp);
        self.write_partition(partition, &records).await?;
        Ok(true)
    }

    async fn create_partition(
        &self,
        name: &str,
        check_existence: bool,
    ) -> Result<bool, RemoteError> {
        if check_existence {
            if let Some(document) = self.fetch_document().await? {
                if document.contains_key(name) {
                    warn!(partition = name, "create rejected: partition already exists");
                    return Ok(false);
                }
            }
        }

        self.write_partition(name, &[]).await?;
        Ok(true)
    }

    async fn create_document(&self, check_existence: bool) -> Result<bool, RemoteError> {
        if check_existence && self.get_document_raw().await?.is_some() {
            debug!(entity = %self.entity_id, "document already exists, not creating");
            return Ok(false);
        }

        let url = format!("{}/{}", self.documents_root_url(), self.collection);
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .query(&[("documentId", self.entity_id.as_str())])
            .json(&FirestoreDocument::default())
            .send()
            .await?;

        Self::check_response(response).await?;
        debug!(entity = %self.entity_id, "created remote document");
        Ok(true)
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, RemoteError> {
        // Field in the mask, absent from the body: Firestore deletes it.
        self.patch_fields(&[name], HashMap::new()).await?;
        Ok(true)
    }

    async fn rename_partition(&self, from: &str, to: &str) -> Result<bool, RemoteError> {
        // Three round trips, not atomic. A failure after the write leaves
        // both names populated until the delete is retried.
        let Some(records) = self.fetch_partition(from).await? else {
            warn!(partition = from, "rename rejected: source partition not found");
            return Ok(false);
        };

        self.write_partition(to, &records).await?;
        self.delete_partition(from).await?;
        Ok(true)
    }

    async fn partition_exists(&self, name: &str) -> Result<bool, RemoteError> {
        let document = self.fetch_document().await?;
        Ok(document.is_some_and(|d| d.contains_key(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            project_id: "demo-project".to_string(),
            collection: "users".to_string(),
            base_url: None,
            last_entity_id: None,
        }
    }

    #[test]
    fn test_document_url() {
        let client = FirestoreClient::new(&test_config(), "u1").unwrap();
        assert_eq!(
            client.document_url(),
            "https://firestore.googleapis.com/v1/projects/demo-project/databases/(default)/documents/users/u1"
        );
    }

    #[test]
    fn test_with_token_sets_authorization_header() {
        let client = FirestoreClient::new(&test_config(), "u1").unwrap();
        assert!(client.auth_headers().unwrap().is_empty());

        let authed = client.with_token("id-token".to_string());
        let headers = authed.auth_headers().unwrap();
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            "Bearer id-token"
        );
        // The unauthenticated client is untouched.
        assert!(client.auth_headers().unwrap().is_empty());
    }

    #[test]
    fn test_parse_document_response() {
        let json = r#"{
            "name": "projects/demo-project/databases/(default)/documents/users/u1",
            "fields": {
                "steps": {
                    "arrayValue": {
                        "values": [
                            {"stringValue": "2025-07-16T08:30:00Z 1 2 3"},
                            {"stringValue": "2025-07-17T08:30:00Z 4"}
                        ]
                    }
                },
                "distance": {
                    "arrayValue": {}
                }
            },
            "createTime": "2025-07-11T00:00:00Z",
            "updateTime": "2025-07-17T09:00:00Z"
        }"#;

        let document: FirestoreDocument =
            serde_json::from_str(json).expect("Failed to parse document JSON");
        let fields = document.into_string_fields();

        assert_eq!(
            fields.get("steps").unwrap(),
            &vec![
                "2025-07-16T08:30:00Z 1 2 3".to_string(),
                "2025-07-17T08:30:00Z 4".to_string()
            ]
        );
        // Empty arrays arrive without a `values` key
        assert_eq!(fields.get("distance").unwrap(), &Vec::<String>::new());
    }

    #[test]
    fn test_parse_document_without_fields() {
        // A freshly created document has no `fields` key at all
        let json = r#"{"name": "projects/p/databases/(default)/documents/users/u1"}"#;
        let document: FirestoreDocument = serde_json::from_str(json).unwrap();
        assert!(document.into_string_fields().is_empty());
    }

    #[test]
    fn test_serialize_merge_body() {
        let mut fields = HashMap::new();
        fields.insert(
            "steps".to_string(),
            vec!["2025-07-16T08:30:00Z 1".to_string()],
        );
        let body = FirestoreDocument::from_string_fields(fields);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "fields": {
                    "steps": {
                        "arrayValue": {
                            "values": [{"stringValue": "2025-07-16T08:30:00Z 1"}]
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_serialize_empty_partition_omits_values() {
        let mut fields = HashMap::new();
        fields.insert("steps".to_string(), vec![]);
        let body = FirestoreDocument::from_string_fields(fields);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "fields": {"steps": {"arrayValue": {}}}
            })
        );
    }
}
