use crate::error::{PipelineError, Result};
use crate::models::{CachedTranscript, Channel};
use crate::services::transcript_cache::{ChannelStore, TranscriptCache};
use async_trait::async_trait;
use elasticsearch::{
    indices::IndicesCreateParts, CreateParts, Elasticsearch, GetParts, IndexParts, MgetParts,
};
use log::{debug, error, info};
use serde_json::{json, Value};

const STATUS_NOT_FOUND: u16 = 404;
const STATUS_CONFLICT: u16 = 409;

/// Document-level reading of an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocStatus {
    Ok,
    Missing,
    Conflict,
    Failed,
}

fn doc_status(code: u16) -> DocStatus {
    match code {
        200..=299 => DocStatus::Ok,
        STATUS_NOT_FOUND => DocStatus::Missing,
        STATUS_CONFLICT => DocStatus::Conflict,
        _ => DocStatus::Failed,
    }
}

/// Elasticsearch-backed channel table and transcript cache.
#[derive(Clone)]
pub struct ElasticStore {
    client: Elasticsearch,
    channel_index: String,
    transcript_index: String,
}

impl ElasticStore {
    pub fn new(client: Elasticsearch, channel_index: String, transcript_index: String) -> Self {
        Self {
            client,
            channel_index,
            transcript_index,
        }
    }

    /// Creates both indices. Safe to call on every startup.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.create_index(
            &self.channel_index,
            json!({
                "mappings": {
                    "properties": {
                        "channel_id": { "type": "keyword" },
                        "handle": { "type": "keyword" }
                    }
                }
            }),
        )
        .await?;

        self.create_index(
            &self.transcript_index,
            json!({
                "mappings": {
                    "properties": {
                        "video_id": { "type": "keyword" },
                        "channel_id": { "type": "keyword" },
                        "title": { "type": "text" },
                        "published_date": { "type": "keyword" },
                        "transcript": { "type": "text", "index": false }
                    }
                }
            }),
        )
        .await
    }

    async fn create_index(&self, index: &str, body: Value) -> Result<()> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body)
            .send()
            .await?;

        if response.status_code().is_success() {
            info!("Elasticsearch index '{index}' created.");
            return Ok(());
        }

        let response_text = response.text().await.unwrap_or_default();
        if is_already_exists(&response_text) {
            info!("Elasticsearch index '{index}' already exists.");
            Ok(())
        } else {
            error!("Failed to create Elasticsearch index '{index}': {response_text}");
            Err(PipelineError::storage(format!(
                "failed to create index '{index}'"
            )))
        }
    }

    async fn get_source<T: serde::de::DeserializeOwned>(
        &self,
        index: &str,
        id: &str,
    ) -> Result<Option<T>> {
        let response = self.client.get(GetParts::IndexId(index, id)).send().await?;
        let status = response.status_code();

        match doc_status(status.as_u16()) {
            DocStatus::Ok => {}
            DocStatus::Missing => return Ok(None),
            DocStatus::Conflict | DocStatus::Failed => {
                let body = response.text().await.unwrap_or_default();
                error!("Failed to read {index}/{id}: {body}");
                return Err(PipelineError::storage(format!(
                    "get {index}/{id} returned HTTP {status}"
                )));
            }
        }

        let json_response: Value = response.json().await?;
        match json_response.get("_source") {
            Some(source) => Ok(Some(serde_json::from_value(source.clone())?)),
            None => Ok(None),
        }
    }
}

fn is_already_exists(response_text: &str) -> bool {
    response_text.contains("resource_already_exists_exception")
}

/// Pulls the `_source` of every found doc out of an `_mget` response.
fn found_sources(json_response: &Value) -> Result<Vec<CachedTranscript>> {
    let mut found = Vec::new();
    if let Some(docs) = json_response["docs"].as_array() {
        for doc in docs {
            if doc["found"].as_bool() != Some(true) {
                continue;
            }
            if let Some(source) = doc.get("_source") {
                found.push(serde_json::from_value(source.clone())?);
            }
        }
    }
    Ok(found)
}

#[async_trait]
impl TranscriptCache for ElasticStore {
    async fn get(&self, video_id: &str) -> Result<Option<CachedTranscript>> {
        self.get_source(&self.transcript_index, video_id).await
    }

    async fn put_if_absent(&self, entry: CachedTranscript) -> Result<bool> {
        let response = self
            .client
            .create(CreateParts::IndexId(&self.transcript_index, &entry.video_id))
            .body(&entry)
            .send()
            .await?;
        let status = response.status_code();

        match doc_status(status.as_u16()) {
            DocStatus::Ok => {
                debug!("Stored transcript for video ID {}", entry.video_id);
                Ok(true)
            }
            DocStatus::Conflict => Ok(false),
            DocStatus::Missing | DocStatus::Failed => {
                let body = response.text().await.unwrap_or_default();
                error!(
                    "Failed to store transcript for video ID {}: {body}",
                    entry.video_id
                );
                Err(PipelineError::storage(format!(
                    "create {}/{} returned HTTP {status}",
                    self.transcript_index, entry.video_id
                )))
            }
        }
    }

    async fn get_many(&self, video_ids: &[String]) -> Result<Vec<CachedTranscript>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .mget(MgetParts::Index(&self.transcript_index))
            .body(json!({ "ids": video_ids }))
            .send()
            .await?;

        if !response.status_code().is_success() {
            let status = response.status_code();
            let body = response.text().await.unwrap_or_default();
            error!("Multi-get on '{}' failed: {body}", self.transcript_index);
            return Err(PipelineError::storage(format!(
                "mget {} returned HTTP {status}",
                self.transcript_index
            )));
        }

        let json_response: Value = response.json().await?;
        found_sources(&json_response)
    }
}

#[async_trait]
impl ChannelStore for ElasticStore {
    async fn upsert_channel(&self, channel: &Channel) -> Result<()> {
        let response = self
            .client
            .index(IndexParts::IndexId(&self.channel_index, &channel.channel_id))
            .body(json!(channel))
            .send()
            .await?;

        if response.status_code().is_success() {
            Ok(())
        } else {
            let status = response.status_code();
            let body = response.text().await.unwrap_or_default();
            error!(
                "Failed to index channel {}: {body}",
                channel.channel_id
            );
            Err(PipelineError::storage(format!(
                "index {}/{} returned HTTP {status}",
                self.channel_index, channel.channel_id
            )))
        }
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>> {
        self.get_source(&self.channel_index, channel_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_status_classification() {
        assert_eq!(doc_status(200), DocStatus::Ok);
        assert_eq!(doc_status(201), DocStatus::Ok);
        assert_eq!(doc_status(404), DocStatus::Missing);
        assert_eq!(doc_status(409), DocStatus::Conflict);
        assert_eq!(doc_status(400), DocStatus::Failed);
        assert_eq!(doc_status(503), DocStatus::Failed);
    }

    #[test]
    fn test_already_exists_detection() {
        let body = r#"{"error":{"root_cause":[{"type":"resource_already_exists_exception","reason":"index [transcripts/abc] already exists"}]},"status":400}"#;
        assert!(is_already_exists(body));
        assert!(!is_already_exists(r#"{"error":{"type":"cluster_block_exception"}}"#));
    }

    #[test]
    fn test_found_sources_skips_missing_docs() {
        let response = json!({
            "docs": [
                {
                    "_index": "transcripts",
                    "_id": "vid1",
                    "found": true,
                    "_source": {
                        "video_id": "vid1",
                        "channel_id": "UC123",
                        "title": "First",
                        "published_date": "2024-01-15T10:30:00Z",
                        "transcript": "hello world"
                    }
                },
                { "_index": "transcripts", "_id": "vid2", "found": false }
            ]
        });

        let found = found_sources(&response).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].video_id, "vid1");
        assert_eq!(found[0].transcript.as_deref(), Some("hello world"));
    }

    #[test]
    fn test_found_sources_rejects_malformed_source() {
        let response = json!({
            "docs": [{ "_id": "vid1", "found": true, "_source": { "video_id": 7 } }]
        });
        let err = found_sources(&response).unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
    }
}
