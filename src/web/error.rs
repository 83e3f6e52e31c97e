//! API error handling for the qrdrop web server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ShareError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// No file field in the upload form (400).
    NoFileProvided,
    /// Zero-byte upload (400).
    EmptyUpload,
    /// Not found (404).
    NotFound,
    /// Conflict (409).
    Conflict,
    /// Upload over the size limit (413).
    PayloadTooLarge,
    /// Unprocessable entity (422).
    UnprocessableEntity,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest | ErrorCode::NoFileProvided | ErrorCode::EmptyUpload => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Error code.
    pub code: ErrorCode,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ShareError> for ApiError {
    fn from(err: ShareError) -> Self {
        match &err {
            ShareError::NoFileProvided => {
                ApiError::new(ErrorCode::NoFileProvided, "Please choose a file to upload")
            }
            ShareError::EmptyUpload => {
                ApiError::new(ErrorCode::EmptyUpload, "The uploaded file is empty")
            }
            ShareError::SizeExceeded { limit } => ApiError::new(
                ErrorCode::PayloadTooLarge,
                format!("File too large (max {})", format_limit(*limit)),
            ),
            ShareError::Multipart(msg) => {
                tracing::warn!("Rejected upload body: {}", msg);
                ApiError::bad_request("Invalid multipart data")
            }
            ShareError::NotFound(_) | ShareError::PathTraversalRejected(_) => {
                tracing::warn!("Rejected request: {}", err);
                ApiError::not_found("File not found")
            }
            ShareError::Conflict(_) => {
                tracing::warn!("{}", err);
                ApiError::new(ErrorCode::Conflict, "A file with this name already exists")
            }
            ShareError::OversizedInput { .. } => {
                tracing::warn!("Rejected request: {}", err);
                ApiError::new(ErrorCode::UnprocessableEntity, "Link is too long for a QR code")
            }
            _ => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

fn format_limit(limit: u64) -> String {
    const MB: u64 = 1024 * 1024;
    if limit >= MB && limit % MB == 0 {
        format!("{}MB", limit / MB)
    } else {
        format!("{limit} bytes")
    }
}
