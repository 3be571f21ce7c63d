use crate::error::{PipelineError, Result};
use crate::models::VideoDescriptor;
use crate::utils::format_rfc3339_z;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/youtube/v3/";

/// Upstream page size ceiling for `search.list`.
pub const MAX_PAGE_SIZE: u32 = 50;

/// How a handle is turned into a channel id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLookup {
    /// `channels.list?forHandle=`: exact handle match.
    Handle,
    /// `search.list?type=channel&q=`: top hit of a free-text search.
    Search,
}

impl std::str::FromStr for ChannelLookup {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "handle" => Ok(ChannelLookup::Handle),
            "search" => Ok(ChannelLookup::Search),
            other => Err(format!("unknown channel lookup '{other}' (expected handle or search)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoQuery {
    pub channel_id: String,
    pub published_after: Option<DateTime<Utc>>,
    pub published_before: Option<DateTime<Utc>>,
    pub page_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoPage {
    pub videos: Vec<VideoDescriptor>,
    pub next_page_token: Option<String>,
}

/// The video platform's channel and search capabilities.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Returns the first matching channel id, or `None` when nothing matched.
    async fn lookup_channel(&self, handle: &str, lookup: ChannelLookup) -> Result<Option<String>>;

    async fn search_videos(&self, query: &VideoQuery, page_token: Option<&str>) -> Result<VideoPage>;
}

// Documentation: https://developers.google.com/youtube/v3/docs/search/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Option<SearchSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    published_at: String,
    channel_id: Option<String>,
}

// Documentation: https://developers.google.com/youtube/v3/docs/channels/list
#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
}

/// YouTube Data API v3 client.
pub struct DataApiClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl DataApiClient {
    pub fn new(base_url: Url, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::upstream(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PipelineError::upstream(format!("invalid API url for {path}: {e}")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!("GET {url} {:?}", params.iter().map(|(k, _)| k).collect::<Vec<_>>());

        let response = self
            .client
            .get(url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("YouTube API {path} failed with status {status}: {body}");
            return Err(PipelineError::upstream(format!("{path} returned HTTP {status}")));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl VideoPlatform for DataApiClient {
    async fn lookup_channel(&self, handle: &str, lookup: ChannelLookup) -> Result<Option<String>> {
        match lookup {
            ChannelLookup::Handle => {
                let response: ChannelListResponse = self
                    .get_json(
                        "channels",
                        &[("part", "id".to_string()), ("forHandle", handle.to_string())],
                    )
                    .await?;
                Ok(first_channel_id(&response))
            }
            ChannelLookup::Search => {
                let response: SearchListResponse = self
                    .get_json(
                        "search",
                        &[
                            ("part", "snippet".to_string()),
                            ("type", "channel".to_string()),
                            ("maxResults", "1".to_string()),
                            ("q", handle.to_string()),
                        ],
                    )
                    .await?;
                Ok(first_search_channel_id(&response))
            }
        }
    }

    async fn search_videos(&self, query: &VideoQuery, page_token: Option<&str>) -> Result<VideoPage> {
        let mut params = vec![
            ("part", "id,snippet".to_string()),
            ("channelId", query.channel_id.clone()),
            ("type", "video".to_string()),
            ("order", "date".to_string()),
            ("maxResults", query.page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(after) = query.published_after {
            params.push(("publishedAfter", format_rfc3339_z(after)));
        }
        if let Some(before) = query.published_before {
            params.push(("publishedBefore", format_rfc3339_z(before)));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let response: SearchListResponse = self.get_json("search", &params).await?;
        Ok(into_video_page(response))
    }
}

fn first_channel_id(response: &ChannelListResponse) -> Option<String> {
    response
        .items
        .first()
        .map(|item| item.id.clone())
        .filter(|id| !id.is_empty())
}

fn first_search_channel_id(response: &SearchListResponse) -> Option<String> {
    response.items.iter().find_map(|item| {
        item.id
            .channel_id
            .clone()
            .or_else(|| item.snippet.as_ref().and_then(|s| s.channel_id.clone()))
    })
}

fn into_video_page(response: SearchListResponse) -> VideoPage {
    let videos = response
        .items
        .into_iter()
        .filter_map(|item| {
            let video_id = item.id.video_id?;
            let snippet = item.snippet?;
            Some(VideoDescriptor {
                video_id,
                title: html_escape::decode_html_entities(&snippet.title).to_string(),
                published_at: snippet.published_at,
            })
        })
        .collect();

    VideoPage {
        videos,
        next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
    }
}
