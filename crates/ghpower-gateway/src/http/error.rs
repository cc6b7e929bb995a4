use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ghpower_core::GhpowerError;
use serde_json::json;
use tracing::error;

/// Handler error: a [`GhpowerError`] rendered as `{ "error", "code" }`.
#[derive(Debug)]
pub struct ApiError(pub GhpowerError);

impl<E: Into<GhpowerError>> From<E> for ApiError {
    fn from(e: E) -> Self {
        ApiError(e.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            GhpowerError::InvalidUsername(_) | GhpowerError::UnknownMetric { .. } => {
                StatusCode::BAD_REQUEST
            }
            GhpowerError::ProfileNotFound { .. } => StatusCode::NOT_FOUND,
            GhpowerError::Fetch(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.0.code(), "request failed: {}", self.0);
        }
        (
            status,
            Json(json!({
                "error": self.0.to_string(),
                "code": self.0.code(),
            })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
