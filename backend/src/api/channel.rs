use crate::models::{ErrorResponse, FindChannelRequest, FindChannelResponse};
use crate::AppState;
use rocket::serde::json::Json;
use rocket::{post, State};

#[post("/find-channel-id", data = "<request>")]
pub async fn find_channel_id(
    request: Json<FindChannelRequest>,
    state: &State<AppState>,
) -> Result<Json<FindChannelResponse>, ErrorResponse> {
    let handle = request.into_inner().handle.unwrap_or_default();
    let channel_id = state.resolver.resolve(&handle).await?;
    Ok(Json(FindChannelResponse { channel_id }))
}
