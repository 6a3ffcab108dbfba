//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use carebell_core::error::{CareError, ErrorCode};
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                "Request failed"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<CareError> for ApiError {
    fn from(err: CareError) -> Self {
        let code = err.code();
        let suggestion = err.suggestion().map(str::to_string);

        let api = match err {
            CareError::Validation {
                message, details, ..
            } => {
                let mut api = ApiError::validation(message);
                if !details.is_empty() {
                    api = api.with_details(json!(details));
                }
                api
            }
            CareError::NotFound { message, .. } => ApiError::not_found(message),
            CareError::AccessDenied { message, .. } => ApiError::unauthorized(message),
            CareError::Voice { message, code } => match code {
                ErrorCode::VoiUnsupported | ErrorCode::VoiAudioCapture => {
                    ApiError::unavailable(message)
                }
                _ => ApiError::validation(message),
            },
            CareError::Notification { message, .. } => ApiError::unavailable(message),
            CareError::Configuration(msg) => ApiError::bad_request(msg),
            CareError::Parse { message, .. } => ApiError::bad_request(message),
            CareError::Database { message, .. } => {
                ApiError::internal(format!("Database error: {}", message))
            }
            CareError::Network { message, .. } => {
                ApiError::internal(format!("Network error: {}", message))
            }
            CareError::Scheduler(msg) => ApiError::internal(format!("Scheduler error: {}", msg)),
            CareError::Serialization(e) => {
                ApiError::internal(format!("Serialization error: {}", e))
            }
            CareError::Io(e) => ApiError::internal(format!("IO error: {}", e)),
            CareError::Internal(msg) => ApiError::internal(msg),
        };

        match (api.details.is_none(), suggestion) {
            (true, Some(suggestion)) => api.with_details(json!({
                "errorCode": code.as_str(),
                "suggestion": suggestion,
            })),
            _ => api,
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
