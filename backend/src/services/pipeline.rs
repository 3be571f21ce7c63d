use crate::error::{PipelineError, Result};
use crate::models::{CachedTranscript, SearchHit, VideoDescriptor};
use crate::services::observer::{PipelineObserver, PopulateSummary};
use crate::services::search_service::{build_matcher, SearchEngine};
use crate::services::transcript_cache::TranscriptCache;
use crate::services::transcript_fetcher::TranscriptFetcher;
use crate::services::video_lister::{DateWindow, VideoLister};
use crate::utils::non_blank;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// A validated search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub channel_id: String,
    pub phrase: String,
    pub window: DateWindow,
}

impl SearchRequest {
    pub fn new(
        channel_id: &str,
        phrase: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Self> {
        let channel_id = channel_id.trim();
        if channel_id.is_empty() || phrase.trim().is_empty() {
            return Err(PipelineError::validation(
                "Channel ID and search phrase are required",
            ));
        }
        let window = DateWindow::parse(non_blank(start_date), non_blank(end_date))?;
        Ok(Self {
            channel_id: channel_id.to_string(),
            phrase: phrase.to_string(),
            window,
        })
    }
}

/// Hits plus the counts that tell "no videos" apart from "no transcripts".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub videos_listed: usize,
    pub transcripts_searched: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Populated {
    CacheHit,
    Inserted,
    AlreadyPresent,
    Absent,
    Skipped,
}

/// list → populate cache → re-read → search.
pub struct SearchPipeline {
    lister: VideoLister,
    fetcher: TranscriptFetcher,
    cache: Arc<dyn TranscriptCache>,
    engine: SearchEngine,
    observer: Arc<dyn PipelineObserver>,
    concurrency: usize,
}

impl SearchPipeline {
    pub fn new(
        lister: VideoLister,
        fetcher: TranscriptFetcher,
        cache: Arc<dyn TranscriptCache>,
        engine: SearchEngine,
        observer: Arc<dyn PipelineObserver>,
        concurrency: usize,
    ) -> Self {
        Self {
            lister,
            fetcher,
            cache,
            engine,
            observer,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run_search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        // Fail on a bad phrase before spending any quota.
        build_matcher(&request.phrase)?;

        let videos = self
            .lister
            .list(&request.channel_id, request.window)
            .await?;
        self.observer
            .videos_listed(&request.channel_id, videos.len());

        let summary = self.populate(&request.channel_id, &videos).await;
        self.observer
            .cache_populated(&request.channel_id, &summary);

        let ids: Vec<String> = videos.iter().map(|v| v.video_id.clone()).collect();
        let searchable: Vec<CachedTranscript> = self
            .cache
            .get_many(&ids)
            .await?
            .into_iter()
            .filter(|entry| entry.transcript.is_some())
            .collect();

        let hits = self.engine.search(&searchable, &request.phrase)?;
        self.observer
            .search_completed(&request.channel_id, searchable.len(), hits.len());

        Ok(SearchOutcome {
            hits,
            videos_listed: videos.len(),
            transcripts_searched: searchable.len(),
        })
    }

    /// Makes sure every listed video with a transcript has a cache row.
    /// Per-video failures are reported and skipped.
    async fn populate(&self, channel_id: &str, videos: &[VideoDescriptor]) -> PopulateSummary {
        let tasks: Vec<_> = videos
            .iter()
            .map(|video| self.populate_one(channel_id, video))
            .collect();

        stream::iter(tasks)
            .buffer_unordered(self.concurrency)
            .fold(PopulateSummary::default(), |mut summary, outcome| async move {
                match outcome {
                    Populated::CacheHit => summary.cache_hits += 1,
                    Populated::Inserted => summary.inserted += 1,
                    Populated::AlreadyPresent => summary.already_present += 1,
                    Populated::Absent => summary.absent += 1,
                    Populated::Skipped => summary.skipped += 1,
                }
                summary
            })
            .await
    }

    async fn populate_one(&self, channel_id: &str, video: &VideoDescriptor) -> Populated {
        match self.try_populate(channel_id, video).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.observer.video_skipped(&video.video_id, &e);
                Populated::Skipped
            }
        }
    }

    async fn try_populate(&self, channel_id: &str, video: &VideoDescriptor) -> Result<Populated> {
        if self.cache.get(&video.video_id).await?.is_some() {
            return Ok(Populated::CacheHit);
        }

        let Some(text) = self.fetcher.fetch(&video.video_id).await? else {
            self.observer.transcript_absent(&video.video_id);
            return Ok(Populated::Absent);
        };

        let chars = text.chars().count();
        let entry = CachedTranscript {
            video_id: video.video_id.clone(),
            channel_id: channel_id.to_string(),
            title: video.title.clone(),
            published_date: video.published_at.clone(),
            transcript: Some(text),
        };

        if self.cache.put_if_absent(entry).await? {
            self.observer.transcript_cached(&video.video_id, chars);
            Ok(Populated::Inserted)
        } else {
            self.observer.transcript_already_present(&video.video_id);
            Ok(Populated::AlreadyPresent)
        }
    }
}
