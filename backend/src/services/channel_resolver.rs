use crate::error::{PipelineError, Result};
use crate::models::Channel;
use crate::services::observer::PipelineObserver;
use crate::services::transcript_cache::ChannelStore;
use crate::services::youtube_api::{ChannelLookup, VideoPlatform};
use std::sync::Arc;

/// Maps a handle such as `@name` to the platform's channel id and
/// remembers the mapping.
pub struct ChannelResolver {
    platform: Arc<dyn VideoPlatform>,
    store: Arc<dyn ChannelStore>,
    observer: Arc<dyn PipelineObserver>,
    lookup: ChannelLookup,
}

impl ChannelResolver {
    pub fn new(
        platform: Arc<dyn VideoPlatform>,
        store: Arc<dyn ChannelStore>,
        observer: Arc<dyn PipelineObserver>,
        lookup: ChannelLookup,
    ) -> Self {
        Self {
            platform,
            store,
            observer,
            lookup,
        }
    }

    pub async fn resolve(&self, handle: &str) -> Result<String> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(PipelineError::validation("Handle is required"));
        }

        let channel_id = self
            .platform
            .lookup_channel(handle, self.lookup)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("Channel not found for '{handle}'")))?;

        self.store
            .upsert_channel(&Channel {
                channel_id: channel_id.clone(),
                handle: handle.to_string(),
            })
            .await?;

        self.observer.channel_resolved(handle, &channel_id);
        Ok(channel_id)
    }
}
