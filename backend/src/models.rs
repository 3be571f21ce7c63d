use crate::error::PipelineError;
use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::Responder;
use rocket::serde::{Deserialize, Serialize};
use rocket::{response, Response};
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: String,
    pub handle: String,
}

/// One row of the transcript cache. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTranscript {
    pub video_id: String,
    pub channel_id: String,
    pub title: String,
    pub published_date: String,
    pub transcript: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    pub video_id: String,
    pub title: String,
    /// RFC 3339 `publishedAt` as reported by the Data API.
    pub published_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub video_id: String,
    pub title: String,
    #[serde(rename = "date")]
    pub published_date: String,
    /// Char offset of the occurrence inside the flattened transcript.
    pub snippet_offset: usize,
    pub snippet: String,
    #[serde(rename = "matchCount")]
    pub occurrence_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct FindChannelRequest {
    pub handle: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindChannelResponse {
    pub channel_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequestBody {
    pub channel_id: Option<String>,
    pub search_phrase: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub videos_listed: usize,
    pub transcripts_searched: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip)]
    pub status: Status,
}

impl From<PipelineError> for ErrorResponse {
    fn from(e: PipelineError) -> Self {
        ErrorResponse {
            error: e.to_string(),
            status: e.status(),
        }
    }
}

impl<'r> Responder<'r, 'static> for ErrorResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let json = serde_json::to_string(&self).map_err(|_| Status::InternalServerError)?;
        Response::build()
            .status(self.status)
            .header(ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}
