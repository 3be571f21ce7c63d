use rocket::http::Status;

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Failures surfaced by the fetch-cache-search pipeline.
///
/// A transcript that does not exist is not an error; fetchers and caches
/// return `Ok(None)` for it.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("YouTube API error: {0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        PipelineError::Upstream(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        PipelineError::Storage(message.into())
    }

    pub fn status(&self) -> Status {
        match self {
            PipelineError::Validation(_) => Status::BadRequest,
            PipelineError::NotFound(_) => Status::NotFound,
            PipelineError::Upstream(_) => Status::BadGateway,
            PipelineError::Storage(_) => Status::InternalServerError,
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PipelineError::Upstream(format!("request timed out: {e}"))
        } else {
            PipelineError::Upstream(e.to_string())
        }
    }
}

impl From<elasticsearch::Error> for PipelineError {
    fn from(e: elasticsearch::Error) -> Self {
        PipelineError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Storage(format!("malformed document: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PipelineError::validation("x").status(), Status::BadRequest);
        assert_eq!(
            PipelineError::NotFound("x".into()).status(),
            Status::NotFound
        );
        assert_eq!(PipelineError::upstream("x").status(), Status::BadGateway);
        assert_eq!(
            PipelineError::storage("x").status(),
            Status::InternalServerError
        );
    }

    #[test]
    fn test_display_prefixes() {
        assert_eq!(
            PipelineError::validation("Handle is required").to_string(),
            "Handle is required"
        );
        assert_eq!(
            PipelineError::upstream("quota exceeded").to_string(),
            "YouTube API error: quota exceeded"
        );
    }
}
