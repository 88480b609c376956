use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rageval_rag::RagError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::extract::ExtractError;

pub const MISSING_FILES: &str = "Please upload at least one PDF document.";
pub const MISSING_QUERY: &str = "Please enter a query.";

/// Errors returned by the HTTP handlers, rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown RAG model '{0}'")]
    UnknownModel(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Rag(#[from] RagError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownModel(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Extract(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Extract(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Multipart(e) => e.status(),
            ApiError::Rag(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Rag(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(ApiError::UnknownModel("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::BadRequest(MISSING_QUERY.into()).status(), StatusCode::BAD_REQUEST);
        let rag = RagError::PipelineError("none of the 3 chunks could be indexed".into());
        assert_eq!(ApiError::from(rag).status(), StatusCode::INTERNAL_SERVER_ERROR);
        let rag = RagError::InvalidRequest("query must not be empty".into());
        assert_eq!(ApiError::from(rag).status(), StatusCode::BAD_REQUEST);
        let extract = ExtractError::NotUtf8 { name: "notes.txt".into() };
        assert_eq!(ApiError::from(extract).status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn failed_extraction_task_is_a_server_error() {
        let task: tokio::task::JoinHandle<()> = tokio::spawn(async { panic!("extraction panicked") });
        let source = task.await.unwrap_err();
        let extract = ExtractError::Interrupted { name: "big.pdf".into(), source };
        assert_eq!(ApiError::from(extract).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
