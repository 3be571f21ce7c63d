use rocket::http::Status;
use rocket::{catch, get, Request};

use crate::models::ErrorResponse;

#[get("/health")]
pub fn health() -> &'static str {
    "ok"
}

/// Keeps framework errors (malformed JSON, unknown routes) in the same
/// `{"error": ...}` shape as handler errors.
#[catch(default)]
pub fn json_error(status: Status, _request: &Request<'_>) -> ErrorResponse {
    let error = match status.code {
        400 | 422 => "Request body must be a JSON object".to_string(),
        404 => "Not found".to_string(),
        _ => status.reason_lossy().to_string(),
    };
    ErrorResponse { error, status }
}
