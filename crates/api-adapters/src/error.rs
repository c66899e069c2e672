//! HTTP mapping of [`AppError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::{AppError, BlobError};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::NotFound(..) | AppError::Blob(BlobError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthenticated(_) | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Generation(_) | AppError::UploadFailed { .. } | AppError::Blob(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self.0, "request failed");
        }
        let body = match &self.0 {
            AppError::UploadFailed { index, reason } => json!({
                "error": self.0.to_string(),
                "index": index,
                "reason": reason,
            }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
