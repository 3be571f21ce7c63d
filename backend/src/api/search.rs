use crate::models::{ErrorResponse, SearchRequestBody, SearchResponse};
use crate::services::pipeline::SearchRequest;
use crate::AppState;
use log::error;
use rocket::serde::json::Json;
use rocket::{post, State};

#[post("/search", data = "<body>")]
pub async fn search(
    body: Json<SearchRequestBody>,
    state: &State<AppState>,
) -> Result<Json<SearchResponse>, ErrorResponse> {
    let body = body.into_inner();
    let request = SearchRequest::new(
        body.channel_id.as_deref().unwrap_or_default(),
        body.search_phrase.as_deref().unwrap_or_default(),
        body.start_date.as_deref(),
        body.end_date.as_deref(),
    )?;

    match state.pipeline.run_search(&request).await {
        Ok(outcome) => Ok(Json(SearchResponse {
            results: outcome.hits,
            videos_listed: outcome.videos_listed,
            transcripts_searched: outcome.transcripts_searched,
        })),
        Err(e) => {
            error!("Search failed for channel {}: {e}", request.channel_id);
            Err(e.into())
        }
    }
}
