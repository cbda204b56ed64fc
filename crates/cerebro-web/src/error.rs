use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use cerebro_core::error::CerebroError;

/// Message returned for any failure the caller cannot fix.
pub const GENERIC_FAILURE: &str = "Failed to generate plan";

/// JSON API error rendered as `{"message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<CerebroError> for ApiError {
    fn from(err: CerebroError) -> Self {
        match err {
            CerebroError::Unauthorized(msg) => Self::unauthorized(msg),
            CerebroError::InvalidInput(msg) => Self::bad_request(msg),
            CerebroError::NotFound(msg) => Self::not_found(msg),
            other => {
                tracing::error!(upstream = other.is_upstream(), "plan request failed: {other}");
                Self::internal(GENERIC_FAILURE)
            }
        }
    }
}
