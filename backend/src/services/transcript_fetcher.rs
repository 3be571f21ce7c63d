use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use yt_transcript_rs::api::YouTubeTranscriptApi;
use yt_transcript_rs::errors::{CouldNotRetrieveTranscript, CouldNotRetrieveTranscriptReason};

/// One transcript a video offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub language_code: String,
    pub is_generated: bool,
}

impl TrackInfo {
    pub fn manual(language_code: &str) -> Self {
        Self {
            language_code: language_code.to_string(),
            is_generated: false,
        }
    }

    pub fn generated(language_code: &str) -> Self {
        Self {
            language_code: language_code.to_string(),
            is_generated: true,
        }
    }
}

/// A selected track and its caption segment texts, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTrack {
    pub track: TrackInfo,
    pub segments: Vec<String>,
}

/// Caption provider. `Ok(None)` means the video has no usable transcript.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Lists the video's tracks once and fetches the one `policy` selects.
    async fn fetch_selected(
        &self,
        video_id: &str,
        policy: &LanguagePolicy,
    ) -> Result<Option<FetchedTrack>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageOrder {
    /// Every manual track in priority order, then every generated one.
    ManualFirst,
    /// Per language: manual, then generated.
    LanguageFirst,
}

impl std::str::FromStr for LanguageOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual-first" => Ok(LanguageOrder::ManualFirst),
            "language-first" => Ok(LanguageOrder::LanguageFirst),
            other => Err(format!(
                "unknown language order '{other}' (expected manual-first or language-first)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePolicy {
    pub languages: Vec<String>,
    pub order: LanguageOrder,
    pub allow_generated: bool,
}

impl Default for LanguagePolicy {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string(), "en-US".to_string(), "en-GB".to_string()],
            order: LanguageOrder::ManualFirst,
            allow_generated: true,
        }
    }
}

impl LanguagePolicy {
    pub fn select<'a>(&self, available: &'a [TrackInfo]) -> Option<&'a TrackInfo> {
        let find = |language: &str, generated: bool| {
            available.iter().find(|track| {
                track.is_generated == generated
                    && track.language_code.eq_ignore_ascii_case(language)
            })
        };

        match self.order {
            LanguageOrder::ManualFirst => self
                .languages
                .iter()
                .find_map(|lang| find(lang, false))
                .or_else(|| {
                    if self.allow_generated {
                        self.languages.iter().find_map(|lang| find(lang, true))
                    } else {
                        None
                    }
                }),
            LanguageOrder::LanguageFirst => self.languages.iter().find_map(|lang| {
                find(lang, false).or_else(|| {
                    if self.allow_generated {
                        find(lang, true)
                    } else {
                        None
                    }
                })
            }),
        }
    }
}

/// Picks a track per [`LanguagePolicy`] and flattens it to plain text.
pub struct TranscriptFetcher {
    source: Arc<dyn TranscriptSource>,
    policy: LanguagePolicy,
    timeout: Duration,
}

impl TranscriptFetcher {
    pub fn new(source: Arc<dyn TranscriptSource>, policy: LanguagePolicy, timeout: Duration) -> Self {
        Self {
            source,
            policy,
            timeout,
        }
    }

    pub async fn fetch(&self, video_id: &str) -> Result<Option<String>> {
        let fetched = match self
            .bounded(video_id, self.source.fetch_selected(video_id, &self.policy))
            .await?
        {
            Some(fetched) => fetched,
            None => return Ok(None),
        };
        debug!(
            "Using track lang={} generated={} for video ID {video_id}",
            fetched.track.language_code, fetched.track.is_generated
        );

        let text = flatten_segments(&fetched.segments);
        Ok(if text.is_empty() { None } else { Some(text) })
    }

    async fn bounded<T>(&self, video_id: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                PipelineError::upstream(format!(
                    "transcript request for {video_id} timed out after {:?}",
                    self.timeout
                ))
            })?
    }
}

/// Joins caption segments with single spaces, dropping timing and blanks.
pub fn flatten_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| html_escape::decode_html_entities(s.as_ref()).into_owned())
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// [`TranscriptSource`] backed by `yt-transcript-rs`. The listing and the
/// caption download share one HTTP client.
pub struct YtTranscriptSource {
    api: YouTubeTranscriptApi,
    client: Client,
}

impl YtTranscriptSource {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        let api = YouTubeTranscriptApi::new(None, None, Some(client.clone())).map_err(|e| {
            PipelineError::upstream(format!("failed to create transcript client: {e}"))
        })?;
        Ok(Self { api, client })
    }
}

/// Distinguishes "this video has no transcript" from a failed request.
fn is_unavailable(e: &CouldNotRetrieveTranscript) -> bool {
    matches!(
        e.reason,
        Some(CouldNotRetrieveTranscriptReason::TranscriptsDisabled { .. })
            | Some(CouldNotRetrieveTranscriptReason::NoTranscriptFound { .. })
            | Some(CouldNotRetrieveTranscriptReason::VideoUnavailable { .. })
    )
}

fn unavailable_or_upstream<T>(
    video_id: &str,
    action: &str,
    e: CouldNotRetrieveTranscript,
) -> Result<Option<T>> {
    if is_unavailable(&e) {
        debug!("Transcripts unavailable for video ID {video_id}: {e}");
        Ok(None)
    } else {
        Err(PipelineError::upstream(format!(
            "failed to {action} transcript for {video_id}: {e}"
        )))
    }
}

#[async_trait]
impl TranscriptSource for YtTranscriptSource {
    async fn fetch_selected(
        &self,
        video_id: &str,
        policy: &LanguagePolicy,
    ) -> Result<Option<FetchedTrack>> {
        let list = match self.api.list_transcripts(video_id).await {
            Ok(list) => list,
            Err(e) => return unavailable_or_upstream(video_id, "list", e),
        };

        let tracks: Vec<TrackInfo> = list
            .transcripts()
            .map(|t| TrackInfo {
                language_code: t.language_code().to_string(),
                is_generated: t.is_generated(),
            })
            .collect();
        let Some(track) = policy.select(&tracks).cloned() else {
            debug!(
                "No track for video ID {video_id} matches languages {:?}",
                policy.languages
            );
            return Ok(None);
        };

        let code = [track.language_code.as_str()];
        let found = if track.is_generated {
            list.find_generated_transcript(&code)
        } else {
            list.find_manually_created_transcript(&code)
        };
        let transcript = match found {
            Ok(transcript) => transcript,
            Err(e) => return unavailable_or_upstream(video_id, "select", e),
        };

        match transcript.fetch(&self.client, false).await {
            Ok(fetched) => Ok(Some(FetchedTrack {
                segments: fetched.parts().iter().map(|p| p.text.clone()).collect(),
                track,
            })),
            Err(e) => unavailable_or_upstream(video_id, "fetch", e),
        }
    }
}
