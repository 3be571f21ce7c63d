use crate::error::PipelineError;
use log::{debug, info, warn};

/// Tally of one cache-population pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateSummary {
    pub cache_hits: usize,
    pub inserted: usize,
    pub already_present: usize,
    pub absent: usize,
    pub skipped: usize,
}

/// Observability sink the pipeline reports through.
///
/// Every method has an empty default so sinks only implement what they need.
pub trait PipelineObserver: Send + Sync {
    fn channel_resolved(&self, _handle: &str, _channel_id: &str) {}

    fn videos_listed(&self, _channel_id: &str, _count: usize) {}

    fn transcript_cached(&self, _video_id: &str, _chars: usize) {}

    /// Another writer stored the transcript first.
    fn transcript_already_present(&self, _video_id: &str) {}

    fn transcript_absent(&self, _video_id: &str) {}

    fn video_skipped(&self, _video_id: &str, _error: &PipelineError) {}

    fn cache_populated(&self, _channel_id: &str, _summary: &PopulateSummary) {}

    fn search_completed(&self, _channel_id: &str, _transcripts: usize, _hits: usize) {}
}

/// Writes pipeline events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl PipelineObserver for LogObserver {
    fn channel_resolved(&self, handle: &str, channel_id: &str) {
        info!("Resolved channel handle={handle} channel_id={channel_id}");
    }

    fn videos_listed(&self, channel_id: &str, count: usize) {
        info!("Listed videos channel_id={channel_id} count={count}");
    }

    fn transcript_cached(&self, video_id: &str, chars: usize) {
        info!("Cached transcript video_id={video_id} chars={chars}");
    }

    fn transcript_already_present(&self, video_id: &str) {
        debug!("Transcript already cached by another writer video_id={video_id}");
    }

    fn transcript_absent(&self, video_id: &str) {
        debug!("No transcript available video_id={video_id}");
    }

    fn video_skipped(&self, video_id: &str, error: &PipelineError) {
        warn!("Skipping video video_id={video_id} error={error}");
    }

    fn cache_populated(&self, channel_id: &str, summary: &PopulateSummary) {
        info!(
            "Cache populated channel_id={channel_id} hits={} inserted={} already_present={} absent={} skipped={}",
            summary.cache_hits,
            summary.inserted,
            summary.already_present,
            summary.absent,
            summary.skipped,
        );
    }

    fn search_completed(&self, channel_id: &str, transcripts: usize, hits: usize) {
        info!("Search completed channel_id={channel_id} transcripts={transcripts} hits={hits}");
    }
}
