use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cinema_booking::{BookingError, ErrorKind};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    GoneError(String),
    UpstreamError(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::GoneError(msg) => (StatusCode::GONE, msg),
            AppError::UpstreamError(msg) => {
                tracing::warn!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let msg = err.to_string();
        match err.kind() {
            ErrorKind::Validation => AppError::ValidationError(msg),
            ErrorKind::NotFound => AppError::NotFoundError(msg),
            ErrorKind::Conflict => AppError::ConflictError(msg),
            ErrorKind::Expired => AppError::GoneError(msg),
            ErrorKind::Upstream => AppError::UpstreamError(msg),
            ErrorKind::InvalidState | ErrorKind::Persistence => AppError::InternalServerError(msg),
        }
    }
}
