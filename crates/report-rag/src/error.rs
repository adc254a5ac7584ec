//! Error types for the report RAG pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (including missing credentials)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The source document could not be structurally analyzed
    #[error("Failed to parse '{source_name}': {message}")]
    ParseFailure { source_name: String, message: String },

    /// A summarization, answering, or embedding call failed
    #[error("Generation failed: {message}")]
    Generation { message: String, retryable: bool },

    /// An external call exceeded its time budget
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    /// Query attempted before any successful build
    #[error("Please process the document first!")]
    NotReady,

    /// Identifier present in the search store but absent from the payload store
    #[error("Record {id} is indexed for search but has no stored payload")]
    LookupFailure { id: Uuid },

    /// Caller-supplied input violates a precondition
    #[error("Validation error: {0}")]
    Validation(String),

    /// A second build was attempted while one is in flight
    #[error("A document build is already in progress")]
    BuildInProgress,

    /// A build observed a cancellation request
    #[error("Operation cancelled")]
    Cancelled,

    /// Index persistence or consistency error
    #[error("Store error: {0}")]
    Store(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config error
    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a parse failure
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseFailure {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a non-retryable generation error (malformed input or response)
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            retryable: false,
        }
    }

    /// Create a retryable generation error (transient network or quota failure)
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            retryable: true,
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Classify a non-success HTTP status from a model service.
    ///
    /// Quota (429) and server-side (5xx) failures are retryable, everything
    /// else points at the request itself.
    pub fn from_status(service: &str, status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("{} returned HTTP {}: {}", service, status, body);
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status.is_server_error()
        {
            Self::transient(message)
        } else {
            Self::generation(message)
        }
    }

    /// Whether a bounded retry may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Generation { retryable, .. } => *retryable,
            Error::Timeout { .. } => true,
            Error::Http(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::ParseFailure { .. } => (StatusCode::BAD_REQUEST, "parse_failure"),
            Error::Generation { .. } => (StatusCode::SERVICE_UNAVAILABLE, "generation_failure"),
            Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Error::NotReady => (StatusCode::CONFLICT, "not_ready"),
            Error::LookupFailure { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "lookup_failure"),
            Error::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            Error::BuildInProgress => (StatusCode::CONFLICT, "build_in_progress"),
            Error::Cancelled => (StatusCode::CONFLICT, "cancelled"),
            Error::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Toml(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
