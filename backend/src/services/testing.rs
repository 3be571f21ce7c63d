//! In-process stand-ins for the YouTube APIs, used by unit and route tests.

use crate::error::{PipelineError, Result};
use crate::models::VideoDescriptor;
use crate::services::observer::{PipelineObserver, PopulateSummary};
use crate::services::transcript_fetcher::{
    FetchedTrack, LanguagePolicy, TrackInfo, TranscriptSource,
};
use crate::services::youtube_api::{ChannelLookup, VideoPage, VideoPlatform, VideoQuery};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn video(video_id: &str, published_at: &str) -> VideoDescriptor {
    VideoDescriptor {
        video_id: video_id.to_string(),
        title: format!("Video {video_id}"),
        published_at: published_at.to_string(),
    }
}

/// Serves channel lookups and paginated listings from memory. Page tokens
/// are offsets; no date filtering happens here.
#[derive(Clone, Default)]
pub struct FakePlatform {
    handles: HashMap<String, String>,
    searches: HashMap<String, String>,
    videos: HashMap<String, Vec<VideoDescriptor>>,
    fail_lookups: bool,
    fail_page: Option<usize>,
    page_requests: Arc<AtomicUsize>,
    last_query: Arc<Mutex<Option<VideoQuery>>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, handle: &str, channel_id: &str) -> Self {
        self.handles.insert(handle.to_string(), channel_id.to_string());
        self
    }

    pub fn with_search_channel(mut self, query: &str, channel_id: &str) -> Self {
        self.searches.insert(query.to_string(), channel_id.to_string());
        self
    }

    pub fn with_videos(mut self, channel_id: &str, videos: Vec<VideoDescriptor>) -> Self {
        self.videos.insert(channel_id.to_string(), videos);
        self
    }

    pub fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    /// Makes the n-th (1-based) page request fail.
    pub fn failing_page(mut self, n: usize) -> Self {
        self.fail_page = Some(n);
        self
    }

    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<VideoQuery> {
        self.last_query.lock().ok().and_then(|q| q.clone())
    }
}

#[async_trait]
impl VideoPlatform for FakePlatform {
    async fn lookup_channel(&self, handle: &str, lookup: ChannelLookup) -> Result<Option<String>> {
        if self.fail_lookups {
            return Err(PipelineError::upstream("quotaExceeded"));
        }
        let table = match lookup {
            ChannelLookup::Handle => &self.handles,
            ChannelLookup::Search => &self.searches,
        };
        Ok(table.get(handle).cloned())
    }

    async fn search_videos(&self, query: &VideoQuery, page_token: Option<&str>) -> Result<VideoPage> {
        let request = self.page_requests.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut last) = self.last_query.lock() {
            *last = Some(query.clone());
        }
        if self.fail_page == Some(request) {
            return Err(PipelineError::upstream("backendError"));
        }

        let all = self.videos.get(&query.channel_id).cloned().unwrap_or_default();
        let start = page_token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
        let end = (start + query.page_size as usize).min(all.len());
        let videos = all.get(start..end).map(<[_]>::to_vec).unwrap_or_default();

        Ok(VideoPage {
            videos,
            next_page_token: (end < all.len()).then(|| end.to_string()),
        })
    }
}

/// Canned transcripts keyed by video id.
#[derive(Clone, Default)]
pub struct FakeTranscripts {
    tracks: HashMap<String, Vec<TrackInfo>>,
    segments: HashMap<(String, String, bool), Vec<String>>,
    failing: HashSet<String>,
    stalling: HashSet<String>,
    list_calls: Arc<AtomicUsize>,
    fetched: Arc<Mutex<Vec<TrackInfo>>>,
}

impl FakeTranscripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracks(mut self, video_id: &str, tracks: Vec<TrackInfo>) -> Self {
        self.tracks.insert(video_id.to_string(), tracks);
        self
    }

    pub fn with_segments(mut self, video_id: &str, lang: &str, generated: bool, segments: &[&str]) -> Self {
        self.segments.insert(
            (video_id.to_string(), lang.to_string(), generated),
            segments.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// A manual English transcript made of `segments`.
    pub fn with_english(self, video_id: &str, segments: &[&str]) -> Self {
        self.with_tracks(video_id, vec![TrackInfo::manual("en")])
            .with_segments(video_id, "en", false, segments)
    }

    pub fn failing(mut self, video_id: &str) -> Self {
        self.failing.insert(video_id.to_string());
        self
    }

    pub fn stalling(mut self, video_id: &str) -> Self {
        self.stalling.insert(video_id.to_string());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Tracks whose segments were downloaded, in call order.
    pub fn fetched_tracks(&self) -> Vec<TrackInfo> {
        self.fetched.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TranscriptSource for FakeTranscripts {
    async fn fetch_selected(
        &self,
        video_id: &str,
        policy: &LanguagePolicy,
    ) -> Result<Option<FetchedTrack>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.stalling.contains(video_id) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(video_id) {
            return Err(PipelineError::upstream(format!("connection reset for {video_id}")));
        }

        let Some(tracks) = self.tracks.get(video_id) else {
            return Ok(None);
        };
        let Some(track) = policy.select(tracks).cloned() else {
            return Ok(None);
        };
        if let Ok(mut fetched) = self.fetched.lock() {
            fetched.push(track.clone());
        }

        let key = (
            video_id.to_string(),
            track.language_code.clone(),
            track.is_generated,
        );
        Ok(self
            .segments
            .get(&key)
            .cloned()
            .map(|segments| FetchedTrack { track, segments }))
    }
}

/// Collects observer events as strings.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
    summaries: Mutex<Vec<PopulateSummary>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn last_summary(&self) -> Option<PopulateSummary> {
        self.summaries.lock().ok().and_then(|s| s.last().copied())
    }

    fn record(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl PipelineObserver for RecordingObserver {
    fn channel_resolved(&self, handle: &str, channel_id: &str) {
        self.record(format!("resolved:{handle}={channel_id}"));
    }

    fn transcript_cached(&self, video_id: &str, _chars: usize) {
        self.record(format!("cached:{video_id}"));
    }

    fn transcript_already_present(&self, video_id: &str) {
        self.record(format!("present:{video_id}"));
    }

    fn transcript_absent(&self, video_id: &str) {
        self.record(format!("absent:{video_id}"));
    }

    fn video_skipped(&self, video_id: &str, _error: &PipelineError) {
        self.record(format!("skipped:{video_id}"));
    }

    fn cache_populated(&self, _channel_id: &str, summary: &PopulateSummary) {
        if let Ok(mut summaries) = self.summaries.lock() {
            summaries.push(*summary);
        }
    }
}
