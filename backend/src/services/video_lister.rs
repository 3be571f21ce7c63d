use crate::error::{PipelineError, Result};
use crate::models::VideoDescriptor;
use crate::services::youtube_api::{VideoPlatform, VideoQuery, MAX_PAGE_SIZE};
use crate::utils::{end_of_day, parse_day, parse_published_at, start_of_day};
use chrono::NaiveDate;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use log::debug;
use std::sync::Arc;

/// Inclusive publish-date window; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(PipelineError::validation(format!(
                    "startDate {from} is after endDate {to}"
                )));
            }
        }
        Ok(Self { from, to })
    }

    /// Parses optional `YYYY-MM-DD` request dates.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self> {
        let from = from.map(|d| parse_day("startDate", d)).transpose()?;
        let to = to.map(|d| parse_day("endDate", d)).transpose()?;
        Self::new(from, to)
    }

    /// Unparseable timestamps are let through; upstream already filtered them.
    pub fn contains(&self, published_at: &str) -> bool {
        let Some(ts) = parse_published_at(published_at) else {
            return true;
        };
        self.from.map_or(true, |from| ts >= start_of_day(from))
            && self.to.map_or(true, |to| ts <= end_of_day(to))
    }
}

/// Paginates a channel's uploads through [`VideoPlatform::search_videos`].
pub struct VideoLister {
    platform: Arc<dyn VideoPlatform>,
    page_size: u32,
    max_videos: Option<usize>,
}

impl VideoLister {
    /// `max_videos: None` follows continuation tokens until upstream runs out.
    pub fn new(platform: Arc<dyn VideoPlatform>, page_size: u32, max_videos: Option<usize>) -> Self {
        Self {
            platform,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            max_videos,
        }
    }

    /// Lazily yields descriptors; a page is only requested once the previous
    /// one has been consumed.
    pub fn stream(
        &self,
        channel_id: &str,
        window: DateWindow,
    ) -> impl Stream<Item = Result<VideoDescriptor>> + Send + 'static {
        let query = VideoQuery {
            channel_id: channel_id.to_string(),
            published_after: window.from.map(start_of_day),
            published_before: window.to.map(end_of_day),
            page_size: self.page_size,
        };
        let platform = Arc::clone(&self.platform);

        // State: Some(token) while pages remain, None once exhausted.
        let pages = stream::try_unfold(Some(None::<String>), move |cursor| {
            next_page(Arc::clone(&platform), query.clone(), cursor)
        });

        let videos = pages
            .map_ok(|videos| stream::iter(videos.into_iter().map(Ok::<_, PipelineError>)))
            .try_flatten()
            .try_filter(move |video| futures::future::ready(window.contains(&video.published_at)));

        videos.take(self.max_videos.unwrap_or(usize::MAX))
    }

    /// Collects the whole listing. Any page failure discards what was fetched.
    pub async fn list(&self, channel_id: &str, window: DateWindow) -> Result<Vec<VideoDescriptor>> {
        self.stream(channel_id, window).try_collect().await
    }
}

type PageStep = Option<(Vec<VideoDescriptor>, Option<Option<String>>)>;

async fn next_page(
    platform: Arc<dyn VideoPlatform>,
    query: VideoQuery,
    cursor: Option<Option<String>>,
) -> Result<PageStep> {
    let Some(token) = cursor else {
        return Ok(None);
    };
    let page = platform.search_videos(&query, token.as_deref()).await?;
    debug!(
        "Fetched {} videos for channel {} (more: {})",
        page.videos.len(),
        query.channel_id,
        page.next_page_token.is_some()
    );

    // An empty page ends the listing even if upstream hands out another token.
    let next = if page.videos.is_empty() {
        None
    } else {
        page.next_page_token.map(Some)
    };
    Ok(Some((page.videos, next)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{video, FakePlatform};

    fn lister(platform: &FakePlatform, page_size: u32, max: Option<usize>) -> VideoLister {
        VideoLister::new(Arc::new(platform.clone()), page_size, max)
    }

    fn ids(videos: &[VideoDescriptor]) -> Vec<&str> {
        videos.iter().map(|v| v.video_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_follows_continuation_tokens() {
        let platform = FakePlatform::new().with_videos(
            "UC123",
            (1..=5)
                .map(|i| video(&format!("v{i}"), "2024-01-10T12:00:00Z"))
                .collect(),
        );
        let videos = lister(&platform, 2, None)
            .list("UC123", DateWindow::default())
            .await
            .unwrap();

        assert_eq!(ids(&videos), vec!["v1", "v2", "v3", "v4", "v5"]);
        assert_eq!(platform.page_requests(), 3);
    }

    #[tokio::test]
    async fn test_cap_stops_requesting_pages() {
        let platform = FakePlatform::new().with_videos(
            "UC123",
            (1..=10)
                .map(|i| video(&format!("v{i}"), "2024-01-10T12:00:00Z"))
                .collect(),
        );
        let videos = lister(&platform, 2, Some(3))
            .list("UC123", DateWindow::default())
            .await
            .unwrap();

        assert_eq!(ids(&videos), vec!["v1", "v2", "v3"]);
        assert_eq!(platform.page_requests(), 2);
    }

    #[tokio::test]
    async fn test_date_window_is_inclusive_and_enforced() {
        let platform = FakePlatform::new().with_videos(
            "UC123",
            vec![
                video("before", "2023-12-31T23:59:59Z"),
                video("first-second", "2024-01-01T00:00:00Z"),
                video("middle", "2024-01-15T08:00:00Z"),
                video("last-second", "2024-01-31T23:59:59Z"),
                video("after", "2024-02-01T00:00:00Z"),
            ],
        );
        let window = DateWindow::parse(Some("2024-01-01"), Some("2024-01-31")).unwrap();
        let videos = lister(&platform, 50, None).list("UC123", window).await.unwrap();

        assert_eq!(ids(&videos), vec!["first-second", "middle", "last-second"]);
        let query = platform.last_query().unwrap();
        assert_eq!(
            query.published_after.map(crate::utils::format_rfc3339_z).as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
        assert_eq!(
            query.published_before.map(crate::utils::format_rfc3339_z).as_deref(),
            Some("2024-01-31T23:59:59Z")
        );
    }

    #[tokio::test]
    async fn test_page_failure_discards_partial_results() {
        let platform = FakePlatform::new()
            .with_videos(
                "UC123",
                (1..=6)
                    .map(|i| video(&format!("v{i}"), "2024-01-10T12:00:00Z"))
                    .collect(),
            )
            .failing_page(2);
        let err = lister(&platform, 2, None)
            .list("UC123", DateWindow::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_empty_channel_lists_nothing() {
        let platform = FakePlatform::new();
        let videos = lister(&platform, 50, None)
            .list("UCempty", DateWindow::default())
            .await
            .unwrap();
        assert!(videos.is_empty());
        assert_eq!(platform.page_requests(), 1);
    }

    #[test]
    fn test_window_validation() {
        assert!(DateWindow::parse(None, None).unwrap() == DateWindow::default());
        let err = DateWindow::parse(Some("2024-02-01"), Some("2024-01-01")).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(DateWindow::parse(Some("01-02-2024"), None).is_err());
    }

    #[test]
    fn test_window_keeps_unparseable_dates() {
        let window = DateWindow::parse(Some("2024-01-01"), None).unwrap();
        assert!(window.contains("not a date"));
        assert!(!window.contains("2023-06-01T00:00:00Z"));
    }
}
