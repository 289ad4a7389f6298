//! Mapping of domain errors onto HTTP responses

use crate::error::LyceumError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Error returned by every handler; renders as `{"error": "<message>"}`
#[derive(Debug)]
pub struct ApiError(pub LyceumError);

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            LyceumError::NotFound(..) => StatusCode::NOT_FOUND,
            LyceumError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            LyceumError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            LyceumError::Validation(_) | LyceumError::InvalidId(_) => StatusCode::BAD_REQUEST,
            LyceumError::AlreadyExists(_) | LyceumError::InvalidOperation(_) => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LyceumError> for ApiError {
    fn from(err: LyceumError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Storage details stay in the log
            error!("Request failed: {}", self.0);
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
