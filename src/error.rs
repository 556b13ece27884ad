use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Path violation: {0}")]
    PathViolation(String),

    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Storage IO error: {0}")]
    StorageIo(#[from] std::io::Error),

    #[error("Metadata store error: {0}")]
    Metadata(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn success_message(message: &str) -> ApiResponse<()> {
        ApiResponse {
            code: 0,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn error(code: i32, message: &str) -> ApiResponse<()> {
        ApiResponse {
            code,
            message: message.to_string(),
            data: None,
        }
    }
}

impl AppError {
    /// Status code and client-facing message. Server-side details never leave this process.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::PathViolation(_) => (StatusCode::FORBIDDEN, "Access denied".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Jwt(_) => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            AppError::MalformedContainer(_)
            | AppError::Crypto(_)
            | AppError::StorageIo(_)
            | AppError::Metadata(_)
            | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
        }
    }

    fn log(&self) {
        match self {
            AppError::PathViolation(detail) => {
                tracing::error!("Path confinement violation: {}", detail);
            }
            AppError::MalformedContainer(detail) => {
                tracing::error!("Malformed container on disk: {}", detail);
            }
            AppError::Crypto(detail) => tracing::error!("Crypto error: {}", detail),
            AppError::StorageIo(e) => tracing::error!("Storage IO error: {:?}", e),
            AppError::Metadata(e) => tracing::error!("Metadata store error: {:?}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            AppError::Jwt(e) => tracing::warn!("JWT error: {:?}", e),
            _ => {}
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let (status, message) = self.status_and_message();
        let body = Json(ApiResponse::<()>::error(status.as_u16() as i32, &message));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
