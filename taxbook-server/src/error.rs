//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use taxbook_rag::RagError;
use thiserror::Error;
use tracing::error;

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Rag(#[from] RagError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rag(RagError::Config(_)) => StatusCode::BAD_REQUEST,
            Self::Rag(
                RagError::RerankParse { .. }
                | RagError::Generation { .. }
                | RagError::Reranker { .. }
                | RagError::Retrieval { .. },
            ) => StatusCode::BAD_GATEWAY,
            Self::Rag(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_failures_map_to_bad_gateway() {
        let parse = ApiError::from(RagError::RerankParse { message: "x".into() });
        let generation = ApiError::from(RagError::Generation { message: "x".into() });
        assert_eq!(parse.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(generation.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn config_and_validation_map_to_bad_request() {
        assert_eq!(ApiError::from(RagError::Config("x".into())).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn ingestion_failures_are_internal() {
        let err = ApiError::from(RagError::Ingestion { message: "x".into() });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
