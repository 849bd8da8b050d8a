//! API error types

use std::sync::Arc;
use std::time::Duration;

use super::FieldValidationError;

/// Errors that can occur while talking to the remote product service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// Non-success HTTP response from the service.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message or raw response body.
        message: String,
    },

    /// The service (or local pre-flight checks) rejected a write payload.
    #[error("Validation failed: {message}")]
    Validation {
        /// HTTP status code, `None` when rejected before sending.
        status: Option<u16>,
        /// Error message.
        message: String,
        /// Per-field failures, if known.
        fields: Vec<FieldValidationError>,
    },

    /// The requested resource does not exist.
    #[error("Not found: {resource}")]
    NotFound {
        /// Description of the missing resource (e.g. `product 7`).
        resource: String,
    },

    /// Transport failure, no response was received.
    #[error("Network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Request timed out.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The response could not be decoded or violated the product schema.
    #[error("Response parse error: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
        /// Raw response body, if available.
        body: Option<String>,
    },
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(Arc::new(err))
    }
}

impl ApiError {
    /// Creates a new HTTP error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates a not-found error for the given resource.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates a validation error for a payload rejected by the service.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Validation {
            status: Some(status),
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Creates a validation error from local field checks.
    pub fn invalid_fields(fields: Vec<FieldValidationError>) -> Self {
        let message = fields
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self::Validation {
            status: None,
            message,
            fields,
        }
    }

    /// Creates a new parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: None,
        }
    }

    /// Creates a new parse error with the raw response body.
    pub fn parse_with_body(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: Some(body.into()),
        }
    }

    /// Returns the HTTP status code if the service responded.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Validation { status, .. } => *status,
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Returns `true` for transport failures (no response received).
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    /// Returns `true` if this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            Self::Network(_) => true,
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}
