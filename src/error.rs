//! Error types for the event API client

use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Failure reported by a non-reqwest transport (no response was received)
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No refresh token stored")]
    MissingRefreshToken,

    /// Stored access token cannot be sent as an `Authorization` header
    #[error("Access token is not a valid header value")]
    InvalidToken,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Status code of the server response, if this error came from one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api(err) => Some(err.status),
            ClientError::HttpRequest(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// The server's error payload, if this error came from a non-2xx response
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// Non-2xx response from the backend, kept verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    /// Decoded JSON body, or the raw text as a JSON string when it is not JSON
    pub body: Value,
    /// Human-readable message picked from `detail` / `error`, when the backend sent one
    pub message: Option<String>,
}

impl ApiError {
    pub fn from_body(status: StatusCode, raw: &[u8]) -> Self {
        let body = if raw.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(raw)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(raw).into_owned()))
        };
        let message = ["detail", "error"]
            .iter()
            .find_map(|key| body.get(key).and_then(Value::as_str))
            .map(str::to_owned);

        Self {
            status,
            body,
            message,
        }
    }

    /// Field-level validation messages (`{"rating": ["..."]}`) for the given field
    pub fn field_errors(&self, field: &str) -> Vec<&str> {
        match self.body.get(field) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(msg)) => vec![msg.as_str()],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "API error {}: {}", self.status, message),
            None if self.body.is_null() => write!(f, "API error {}", self.status),
            None => write!(f, "API error {}: {}", self.status, self.body),
        }
    }
}

impl std::error::Error for ApiError {}

pub type Result<T> = std::result::Result<T, ClientError>;
