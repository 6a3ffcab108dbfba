//! Error types for carebell operations.
//!
//! This module provides the error hierarchy shared by the store, scheduler,
//! presenter and server layers, with structured error codes and suggestions.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for carebell operations.
pub type CareResult<T> = Result<T, CareError>;

/// Main error type for all carebell operations.
#[derive(Error, Debug)]
pub enum CareError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// Record not found.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        resource: &'static str,
        id: Option<i64>,
    },

    /// Caregiver access code rejected.
    #[error("Access denied: {message}")]
    AccessDenied { message: String, code: ErrorCode },

    /// Alert display is unavailable.
    #[error("Notification error: {message}")]
    Notification { message: String, code: ErrorCode },

    /// Voice capture failed.
    #[error("Voice input error: {message}")]
    Voice { message: String, code: ErrorCode },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Timer or job scheduler failure.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network error (HTTP client).
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,
    ValInvalidFormat,

    // Records (REC_xxx)
    RecNotFound,

    // Access (ACC_xxx)
    AccInvalidCode,

    // Notification (NTF_xxx)
    NtfUnsupported,
    NtfPermissionDenied,

    // Voice (VOI_xxx)
    VoiUnsupported,
    VoiNoSpeech,
    VoiAudioCapture,
    VoiPermissionDenied,
    VoiFailed,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Network (NET_xxx)
    NetTimeout,
    NetConnectionFailed,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseInvalidTimestamp,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ValInvalidFormat => "VAL_003",
            ErrorCode::RecNotFound => "REC_001",
            ErrorCode::AccInvalidCode => "ACC_001",
            ErrorCode::NtfUnsupported => "NTF_001",
            ErrorCode::NtfPermissionDenied => "NTF_002",
            ErrorCode::VoiUnsupported => "VOI_001",
            ErrorCode::VoiNoSpeech => "VOI_002",
            ErrorCode::VoiAudioCapture => "VOI_003",
            ErrorCode::VoiPermissionDenied => "VOI_004",
            ErrorCode::VoiFailed => "VOI_005",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseInvalidTimestamp => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl CareError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error for a missing field.
    pub fn missing_field(field: &str) -> Self {
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.to_string());
        Self::Validation {
            message: format!("'{}' is required", field),
            code: ErrorCode::ValMissingField,
            details,
            suggestion: None,
        }
    }

    /// Create a validation error for a malformed field, with a hint.
    pub fn invalid_format(field: &str, value: &str, suggestion: impl Into<String>) -> Self {
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.to_string());
        details.insert("value".to_string(), value.to_string());
        Self::Validation {
            message: format!("'{}' has an invalid value: '{}'", field, value),
            code: ErrorCode::ValInvalidFormat,
            details,
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a not found error.
    pub fn not_found(resource: &'static str, id: i64) -> Self {
        Self::NotFound {
            message: format!("{} with id {} not found", resource, id),
            code: ErrorCode::RecNotFound,
            resource,
            id: Some(id),
        }
    }

    /// Create an access denied error.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
            code: ErrorCode::AccInvalidCode,
        }
    }

    /// Create a notification error.
    pub fn notification(message: impl Into<String>, code: ErrorCode) -> Self {
        Self::Notification {
            message: message.into(),
            code,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create a timestamp parse error.
    pub fn timestamp(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidTimestamp,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create a network error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Create a scheduler error.
    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::Scheduler(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::AccessDenied { code, .. } => *code,
            Self::Notification { code, .. } => *code,
            Self::Voice { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether this error is a missing-record error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::NotFound { .. } => Some("The record may have been deleted; refresh the list"),
            Self::AccessDenied { .. } => Some("Check the caregiver access code"),
            Self::Notification { .. } => {
                Some("Alerts are unavailable; the reminder list still shows due items")
            }
            Self::Database { .. } => Some("Please try the operation again"),
            _ => None,
        }
    }

    /// Convert from HTTP status code (for client errors).
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            400 | 422 => Self::Validation {
                message: body.to_string(),
                code: ErrorCode::ValInvalidInput,
                details: HashMap::new(),
                suggestion: Some("Please check your request fields".to_string()),
            },
            401 | 403 => Self::AccessDenied {
                message: body.to_string(),
                code: ErrorCode::AccInvalidCode,
            },
            404 => Self::NotFound {
                message: body.to_string(),
                code: ErrorCode::RecNotFound,
                resource: "record",
                id: None,
            },
            _ => Self::Internal(format!("HTTP {}: {}", status, body)),
        }
    }
}

impl From<rusqlite::Error> for CareError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}

impl From<tokio_cron_scheduler::JobSchedulerError> for CareError {
    fn from(err: tokio_cron_scheduler::JobSchedulerError) -> Self {
        Self::Scheduler(err.to_string())
    }
}
