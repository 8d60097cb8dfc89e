//! Centralized Error Handling Module
//!
//! Every failure carries a stable error code so runs can be monitored and
//! degraded inputs traced back to the collection they came from.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - INPUT_xxx: source collection errors
//! - CFG_xxx: Configuration errors
//! - API_xxx: API errors

use std::fmt;

use super::types::Collection;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Source collection the failure belongs to, if any
    pub collection: Option<Collection>,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            collection: None,
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            collection: None,
            source: Some(Box::new(source)),
        }
    }

    /// Tag the error with the collection it concerns
    pub fn for_collection(mut self, collection: Collection) -> Self {
        self.collection = Some(collection);
        self
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.collection {
            Some(collection) => write!(
                f,
                "[{}] {}: {}",
                self.code.as_str(),
                collection,
                self.message
            ),
            None => write!(f, "[{}] {}", self.code.as_str(), self.message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Input Errors (1xx)
    // ============================================
    /// A source collection could not be fetched
    InputUnavailable,
    /// A row could not be parsed into a typed record
    InputMalformed,

    // ============================================
    // Computation Errors (2xx)
    // ============================================
    /// Computation exceeded its time budget
    ComputationTimeout,
    /// The remote authoritative engine returned an error
    AuthoritativeFailed,
    /// Every source collection failed
    Unrecoverable,
    /// Export format not supported
    ExportUnsupportedFormat,

    // ============================================
    // API Errors (3xx)
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,
    /// Resource not found
    ApiNotFound,

    // ============================================
    // Configuration Errors (4xx)
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,
    /// Canonical district table has a conflicting alias
    ConfigDuplicateAlias,

    // ============================================
    // Generic Errors (9xx)
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            // Input Errors
            Self::InputUnavailable => "INPUT_UNAVAILABLE",
            Self::InputMalformed => "INPUT_MALFORMED",

            // Computation Errors
            Self::ComputationTimeout => "COMPUTATION_TIMEOUT",
            Self::AuthoritativeFailed => "AUTHORITATIVE_FAILED",
            Self::Unrecoverable => "UNRECOVERABLE",
            Self::ExportUnsupportedFormat => "EXPORT_UNSUPPORTED_FORMAT",

            // API Errors
            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",
            Self::ApiNotFound => "API_NOT_FOUND",

            // Configuration Errors
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigDuplicateAlias => "CFG_DUPLICATE_ALIAS",

            // Generic
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest
            | Self::InputMalformed
            | Self::ExportUnsupportedFormat
            | Self::ConfigInvalidValue => 400,
            Self::ApiNotFound => 404,
            Self::ApiRateLimited => 429,
            Self::InputUnavailable | Self::AuthoritativeFailed | Self::Unrecoverable => 502,
            Self::ComputationTimeout => 504,
            _ => 500,
        }
    }

    /// Check if the failure is worth degrading around instead of aborting
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::InputUnavailable
                | Self::InputMalformed
                | Self::ComputationTimeout
                | Self::AuthoritativeFailed
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Source collection could not be fetched
    pub fn input_unavailable(collection: Collection, msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InputUnavailable, msg).for_collection(collection)
    }

    /// Row could not be parsed
    pub fn input_malformed(collection: Collection, msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InputMalformed, msg).for_collection(collection)
    }

    /// Time budget exceeded
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ComputationTimeout, msg)
    }

    /// Authoritative engine failed
    pub fn authoritative_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthoritativeFailed, msg)
    }

    /// Every source failed; the message lists the individual causes
    pub fn unrecoverable(causes: &[AppError]) -> Self {
        let joined = causes
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self::new(
            ErrorCode::Unrecoverable,
            format!("All source collections failed: {}", joined),
        )
    }

    /// Unsupported export format
    pub fn unsupported_format(format: &str) -> Self {
        Self::new(
            ErrorCode::ExportUnsupportedFormat,
            format!("Unsupported export format: {}", format),
        )
    }

    /// Duplicate alias in the district table
    pub fn duplicate_alias(alias: &str) -> Self {
        Self::new(
            ErrorCode::ConfigDuplicateAlias,
            format!("District alias maps to more than one district: {}", alias),
        )
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }

    /// API route not found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiNotFound, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::InputUnavailable, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::ComputationTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::InputUnavailable, "Connection failed")
        } else {
            Self::new(ErrorCode::InputUnavailable, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::InputMalformed, "JSON parse error", err)
    }
}
