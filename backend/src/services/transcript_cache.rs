use crate::error::{PipelineError, Result};
use crate::models::{CachedTranscript, Channel};
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Durable transcript cache keyed by video id.
///
/// There is deliberately no update or delete.
#[async_trait]
pub trait TranscriptCache: Send + Sync {
    async fn get(&self, video_id: &str) -> Result<Option<CachedTranscript>>;

    /// Stores `entry` unless a row for its video id exists.
    ///
    /// Returns `false` when another writer got there first; the stored row is
    /// left untouched.
    async fn put_if_absent(&self, entry: CachedTranscript) -> Result<bool>;

    /// Present entries for `video_ids`, in the order of `video_ids`.
    async fn get_many(&self, video_ids: &[String]) -> Result<Vec<CachedTranscript>> {
        let mut found = Vec::with_capacity(video_ids.len());
        for id in video_ids {
            if let Some(entry) = self.get(id).await? {
                found.push(entry);
            }
        }
        Ok(found)
    }
}

/// Channel id → handle table.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Last write wins.
    async fn upsert_channel(&self, channel: &Channel) -> Result<()>;

    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>>;
}

/// Process-local store used for `memory://` storage and in tests.
#[derive(Default)]
pub struct MemoryStore {
    transcripts: Mutex<HashMap<String, CachedTranscript>>,
    channels: RwLock<HashMap<String, Channel>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn transcript_count(&self) -> usize {
        self.transcripts.lock().map(|t| t.len()).unwrap_or(0)
    }
}

fn poisoned<T>(_: T) -> PipelineError {
    PipelineError::storage("in-memory store lock poisoned")
}

#[async_trait]
impl TranscriptCache for MemoryStore {
    async fn get(&self, video_id: &str) -> Result<Option<CachedTranscript>> {
        let transcripts = self.transcripts.lock().map_err(poisoned)?;
        Ok(transcripts.get(video_id).cloned())
    }

    async fn put_if_absent(&self, entry: CachedTranscript) -> Result<bool> {
        let mut transcripts = self.transcripts.lock().map_err(poisoned)?;
        match transcripts.entry(entry.video_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl ChannelStore for MemoryStore {
    async fn upsert_channel(&self, channel: &Channel) -> Result<()> {
        let mut channels = self.channels.write().map_err(poisoned)?;
        channels.insert(channel.channel_id.clone(), channel.clone());
        Ok(())
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>> {
        let channels = self.channels.read().map_err(poisoned)?;
        Ok(channels.get(channel_id).cloned())
    }
}
