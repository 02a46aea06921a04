use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::catalog::CatalogError;
use crate::listing::ListingError;
use crate::prediction::PredictionError;
use crate::tmdb::TmdbError;

/// Error returned by the JSON API; rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,
    #[error("Upstream service error: {0}")]
    Upstream(u16),
    #[error("Upstream service unreachable: {0}")]
    Transport(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Request superseded by a newer listing request, possibly from another client")]
    Superseded { generation: u64 },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Superseded { .. } => StatusCode::CONFLICT,
            ApiError::Upstream(_) | ApiError::Transport(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }
        let body = match &self {
            ApiError::Superseded { generation } => json!({
                "error": self.to_string(),
                "generation": generation,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<TmdbError> for ApiError {
    fn from(e: TmdbError) -> Self {
        match e {
            TmdbError::RateLimited { .. } => ApiError::RateLimited,
            TmdbError::Upstream(404) => ApiError::NotFound("Movie not found".to_string()),
            TmdbError::Upstream(status) => ApiError::Upstream(status),
            TmdbError::Transport(e) => ApiError::Transport(e.to_string()),
            TmdbError::Decode(e) => ApiError::Internal(format!("Invalid TMDB response: {}", e)),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Validation(msg) => ApiError::Validation(msg),
            CatalogError::Tmdb(e) => e.into(),
        }
    }
}

impl From<ListingError> for ApiError {
    fn from(e: ListingError) -> Self {
        match e {
            ListingError::Superseded { generation } => ApiError::Superseded { generation },
            ListingError::Failed(CatalogError::Validation(msg)) => ApiError::Validation(msg),
            ListingError::Failed(CatalogError::Tmdb(TmdbError::RateLimited { .. })) => {
                ApiError::RateLimited
            }
            ListingError::Failed(_) => {
                ApiError::Internal(crate::listing::controller::FAILED_MESSAGE.to_string())
            }
        }
    }
}

impl From<PredictionError> for ApiError {
    fn from(e: PredictionError) -> Self {
        match e {
            PredictionError::Validation(msg) => ApiError::Validation(msg),
            PredictionError::Status(status) => ApiError::Upstream(status),
            PredictionError::Transport(e) => ApiError::Transport(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
